pub mod http_client;
pub mod kamis;
pub mod seasonal;

use crate::models::{Month, PriceRecord, SeasonalFoodRecord};
use async_trait::async_trait;
use thiserror::Error;

pub use self::kamis::KamisClient;
pub use self::seasonal::SeasonalFoodClient;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{endpoint} returned error code {code}: {message}")]
    Upstream {
        endpoint: String,
        code: String,
        message: String,
    },

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("No survey date for {month} {year}")]
    InvalidDate { month: Month, year: i32 },
}

impl SourceError {
    /// Worth another attempt: timeouts, connection failures, 429 and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Http(e) => e.is_timeout() || e.is_connect(),
            SourceError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

// ── Source traits ─────────────────────────────────────────────────────────────

/// Retail price lists for a survey month.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_prices(&self, month: Month, year: i32) -> Result<Vec<PriceRecord>, SourceError>;
}

/// Seasonal produce metadata for a month.
#[async_trait]
pub trait SeasonalFoodSource: Send + Sync {
    async fn fetch_seasonal(&self, month: Month) -> Result<Vec<SeasonalFoodRecord>, SourceError>;
}
