//! Seasonal food price comparisons built from KAMIS retail prices and the
//! seasonal produce grid.
//!
//! [`normalizer`] is the pure core: string-typed price records in, ordered
//! comparison rows out. [`pipeline`] fetches both upstream sources and joins them.

pub mod config;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod report;
pub mod sources;
pub mod utils;
