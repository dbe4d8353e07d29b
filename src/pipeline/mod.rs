//! Dashboard orchestrator: sources → normalizer.
//!
//! ## Loads
//!
//! `load()` — seasonal cards for a month:
//!   1. Fetch the seasonal food list and the KAMIS price list concurrently.
//!   2. If either fetch fails the whole load fails; nothing is normalized against half the data.
//!   3. Join foods to price records by item name and build one comparison table per match.
//!
//! `compare()` — price tables for named items only (no seasonal metadata).
//!
//! `fetch_seasonal()` — the seasonal list alone, from a seasonal source only.
//!
//! Nothing is cached; every call fetches fresh.

use crate::config::AppConfig;
use crate::models::{ComparisonTable, FoodCard, Month, PeriodSet, PriceRecord, SeasonalFoodRecord};
use crate::normalizer::{DisplayRule, build_comparison_table_with, find_record};
use crate::sources::{KamisClient, PriceSource, SeasonalFoodClient, SeasonalFoodSource};
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Dashboard {
    prices: Arc<dyn PriceSource>,
    foods: Arc<dyn SeasonalFoodSource>,
    periods: PeriodSet,
    rule: DisplayRule,
}

impl Dashboard {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let prices = KamisClient::new(&config.kamis, &config.http).context("Failed to build KAMIS client")?;
        let foods = SeasonalFoodClient::new(&config.seasonal, &config.http)
            .context("Failed to build seasonal food client")?;
        let periods = config
            .comparison
            .period_set()
            .context("Invalid comparison periods")?;

        Ok(Self::with_sources(
            Arc::new(prices),
            Arc::new(foods),
            periods,
            config.comparison.display_rule(),
        ))
    }

    pub fn with_sources(
        prices: Arc<dyn PriceSource>,
        foods: Arc<dyn SeasonalFoodSource>,
        periods: PeriodSet,
        rule: DisplayRule,
    ) -> Self {
        Self {
            prices,
            foods,
            periods,
            rule,
        }
    }

    pub async fn load(&self, month: Month, year: i32) -> Result<DashboardReport> {
        info!("=== Loading dashboard for {} {} ===", year, month);

        let (foods, records) = tokio::try_join!(
            async {
                self.foods
                    .fetch_seasonal(month)
                    .await
                    .context("Seasonal food fetch failed")
            },
            async {
                self.prices
                    .fetch_prices(month, year)
                    .await
                    .context("Price fetch failed")
            },
        )?;

        let cards = merge_cards(foods, &records, &self.periods, &self.rule);
        let priced = cards.iter().filter(|c| c.prices.is_some()).count();
        let headline = Headline::pick(&cards);

        info!(
            "=== Done: {} foods | {} with prices | {} price records ===",
            cards.len(),
            priced,
            records.len()
        );

        Ok(DashboardReport {
            month: month.label(),
            year,
            cards,
            headline,
        })
    }

    /// Comparison tables for `items`, in the order given. Items KAMIS does not list get `None`.
    pub async fn compare(&self, month: Month, year: i32, items: &[String]) -> Result<Vec<ItemComparison>> {
        let records = self
            .prices
            .fetch_prices(month, year)
            .await
            .context("Price fetch failed")?;

        let comparisons = items
            .iter()
            .map(|item| {
                let table = find_record(&records, item)
                    .map(|record| build_comparison_table_with(record, &self.periods, &self.rule));
                if table.is_none() {
                    warn!("{}: not in KAMIS price list", item.trim());
                }
                ItemComparison {
                    item: item.trim().to_string(),
                    table,
                }
            })
            .collect();

        Ok(comparisons)
    }
}

/// Seasonal foods only. Takes just the seasonal source, so no price client is built.
pub async fn fetch_seasonal(foods: &dyn SeasonalFoodSource, month: Month) -> Result<Vec<SeasonalFoodRecord>> {
    foods
        .fetch_seasonal(month)
        .await
        .with_context(|| format!("Seasonal food fetch failed for {}", month))
}

/// Attach a comparison table to every food KAMIS lists under the same name.
pub fn merge_cards(
    foods: Vec<SeasonalFoodRecord>,
    records: &[PriceRecord],
    periods: &PeriodSet,
    rule: &DisplayRule,
) -> Vec<FoodCard> {
    foods
        .into_iter()
        .map(|food| {
            let prices = find_record(records, &food.name).map(|r| build_comparison_table_with(r, periods, rule));
            if prices.is_none() {
                debug!("{}: no price record", food.name);
            }
            FoodCard { food, prices }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemComparison {
    pub item: String,
    pub table: Option<ComparisonTable>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub month: String,
    pub year: i32,
    pub cards: Vec<FoodCard>,
    pub headline: Option<Headline>,
}

/// The seasonal item whose price fell furthest against the second period.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Headline {
    pub item_name: String,
    pub change: f64,
    pub current_price: Option<f64>,
    pub unit: String,
}

impl Headline {
    pub fn pick(cards: &[FoodCard]) -> Option<Self> {
        cards
            .iter()
            .filter_map(|card| {
                let table = card.prices.as_ref()?;
                let change = table.headline_change()?;
                Some(Headline {
                    item_name: card.food.name.clone(),
                    change,
                    current_price: table.rows.first().and_then(|r| r.raw_price),
                    unit: table.unit.clone(),
                })
            })
            .min_by(|a, b| a.change.total_cmp(&b.change))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
