//! Seasonal produce grid client.
//!
//! `GET {base}/{key}/json/{grid}/{start}/{end}?M_DISTCTNS=10월` answers
//! `{ "<grid>": { "totalCnt": n, "result": {"code", "message"}, "row": [...] } }`.

use super::http_client::HttpClient;
use super::{SeasonalFoodSource, SourceError};
use crate::config::{HttpConfig, SeasonalConfig};
use crate::models::{Month, SeasonalFoodRecord};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

const ENDPOINT: &str = "seasonal";
const CODE_OK: &str = "INFO-000";
const CODE_NO_DATA: &str = "INFO-200";

#[derive(Debug, Default, Deserialize)]
struct GridBody {
    #[serde(default, rename = "totalCnt")]
    total_count: Option<u64>,
    #[serde(default)]
    result: Option<GridResult>,
    #[serde(default)]
    row: Vec<SeasonalFoodRecord>,
}

#[derive(Debug, Default, Deserialize)]
struct GridResult {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl GridResult {
    fn check(&self) -> Result<(), SourceError> {
        match self.code.as_str() {
            CODE_OK | CODE_NO_DATA | "" => Ok(()),
            code => Err(SourceError::Upstream {
                endpoint: ENDPOINT.to_string(),
                code: code.to_string(),
                message: self.message.clone(),
            }),
        }
    }
}

/// Decode a grid response. A missing grid key means no rows unless a top-level
/// `result` carries an error code (bad key, unknown grid).
pub fn decode_seasonal(body: &str, grid: &str) -> Result<Vec<SeasonalFoodRecord>, SourceError> {
    let mut value: Value = serde_json::from_str(body)?;

    let Some(grid_value) = value.get_mut(grid).map(Value::take) else {
        if let Some(result) = value.get("result") {
            GridResult::deserialize(result)?.check()?;
        }
        return Ok(vec![]);
    };

    let body: GridBody = serde_json::from_value(grid_value)?;
    if let Some(result) = &body.result {
        result.check()?;
    }
    if let Some(total) = body.total_count {
        if total as usize > body.row.len() {
            warn!("{}: {} of {} rows returned; raise end_index", grid, body.row.len(), total);
        }
    }
    Ok(body.row)
}

pub struct SeasonalFoodClient {
    client: HttpClient,
    config: SeasonalConfig,
}

impl SeasonalFoodClient {
    pub fn new(config: &SeasonalConfig, http: &HttpConfig) -> Result<Self, SourceError> {
        if config.api_key.is_empty() {
            warn!("Seasonal API key is empty; set SEASONAL__SEASONAL__API_KEY");
        }
        Ok(Self {
            client: HttpClient::new(http)?,
            config: config.clone(),
        })
    }

    pub fn request_url(&self, month: Month) -> Result<Url, SourceError> {
        let c = &self.config;
        let mut url = Url::parse(&c.base_url)?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push(&c.api_key)
            .push("json")
            .push(&c.grid)
            .push(&c.start_index.to_string())
            .push(&c.end_index.to_string());
        url.query_pairs_mut().append_pair("M_DISTCTNS", &month.label());
        Ok(url)
    }
}

#[async_trait]
impl SeasonalFoodSource for SeasonalFoodClient {
    async fn fetch_seasonal(&self, month: Month) -> Result<Vec<SeasonalFoodRecord>, SourceError> {
        let url = self.request_url(month)?;
        let body = self.client.get_text(ENDPOINT, &url).await?;
        let foods = decode_seasonal(&body, &self.config.grid)?;

        info!("Seasonal {}: {} foods", month, foods.len());
        Ok(foods)
    }
}
