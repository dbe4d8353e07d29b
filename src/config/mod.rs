use crate::models::{Period, PeriodError, PeriodSet};
use crate::normalizer::{AdjustmentTiers, DisplayRule};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub kamis: KamisConfig,
    #[serde(default)]
    pub seasonal: SeasonalConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub comparison: ComparisonConfig,
}

/// KAMIS retail price API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KamisConfig {
    #[serde(default = "default_kamis_url")]
    pub base_url: String,

    #[serde(default = "default_kamis_action")]
    pub action: String,

    #[serde(default)]
    pub cert_key: String,

    #[serde(default)]
    pub cert_id: String,

    /// 01 = retail, 02 = wholesale
    #[serde(default = "default_product_cls_code")]
    pub product_cls_code: String,

    /// 100 = grains; other categories are 200 (vegetables), 300, 400, 500, 600
    #[serde(default = "default_item_category_code")]
    pub item_category_code: String,

    /// 2100 = Seoul-area survey
    #[serde(default = "default_country_code")]
    pub country_code: String,

    #[serde(default = "default_true")]
    pub convert_kg: bool,
}

/// Seasonal produce grid API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeasonalConfig {
    #[serde(default = "default_seasonal_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_grid")]
    pub grid: String,

    #[serde(default = "default_start_index")]
    pub start_index: u32,

    #[serde(default = "default_end_index")]
    pub end_index: u32,
}

/// Shared HTTP client settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Which periods to compare and how display prices are derived
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ComparisonConfig {
    /// "monthly" or "full_week"; ignored when `periods` is set
    #[serde(default = "default_preset")]
    pub preset: String,

    #[serde(default)]
    pub periods: Option<Vec<Period>>,

    #[serde(default = "default_true")]
    pub adjust_display_price: bool,

    #[serde(default)]
    pub tiers: AdjustmentTiers,

    #[serde(default = "default_decimals")]
    pub decimals: usize,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_kamis_url() -> String {
    "https://www.kamis.or.kr/service/price/xml.do".to_string()
}
fn default_kamis_action() -> String {
    "dailyPriceByCategoryList".to_string()
}
fn default_product_cls_code() -> String {
    "01".to_string()
}
fn default_item_category_code() -> String {
    "100".to_string()
}
fn default_country_code() -> String {
    "2100".to_string()
}
fn default_seasonal_url() -> String {
    "http://211.237.50.150:7080/openapi".to_string()
}
fn default_grid() -> String {
    "Grid_20171128000000000572_1".to_string()
}
fn default_start_index() -> u32 {
    1
}
fn default_end_index() -> u32 {
    20
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_max_retries() -> usize {
    2
}
fn default_retry_base_ms() -> u64 {
    500
}
fn default_user_agent() -> String {
    "seasonal-price/0.1".to_string()
}
fn default_preset() -> String {
    "monthly".to_string()
}
fn default_decimals() -> usize {
    2
}
fn default_true() -> bool {
    true
}

impl Default for KamisConfig {
    fn default() -> Self {
        Self {
            base_url: default_kamis_url(),
            action: default_kamis_action(),
            cert_key: String::new(),
            cert_id: String::new(),
            product_cls_code: default_product_cls_code(),
            item_category_code: default_item_category_code(),
            country_code: default_country_code(),
            convert_kg: true,
        }
    }
}

impl Default for SeasonalConfig {
    fn default() -> Self {
        Self {
            base_url: default_seasonal_url(),
            api_key: String::new(),
            grid: default_grid(),
            start_index: default_start_index(),
            end_index: default_end_index(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_ms: default_retry_base_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            preset: default_preset(),
            periods: None,
            adjust_display_price: true,
            tiers: AdjustmentTiers::default(),
            decimals: default_decimals(),
        }
    }
}

impl ComparisonConfig {
    /// Explicit `periods` win over the named preset.
    pub fn period_set(&self) -> Result<PeriodSet, PeriodError> {
        if let Some(periods) = &self.periods {
            return PeriodSet::new(periods.clone());
        }
        match self.preset.trim() {
            "full_week" => Ok(PeriodSet::full_week()),
            "monthly" | "" => Ok(PeriodSet::monthly()),
            other => Err(PeriodError::UnknownPreset(other.to_string())),
        }
    }

    pub fn display_rule(&self) -> DisplayRule {
        if self.adjust_display_price {
            DisplayRule::Tiered(self.tiers)
        } else {
            DisplayRule::Raw
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("SEASONAL").separator("__"))
            .build()?;

        cfg.try_deserialize().context("Invalid configuration")
    }
}
