//! KAMIS `dailyPriceByCategoryList` client.
//!
//! Envelope: `{ "condition": [...], "data": { "error_code": "000", "item": [...] } }`.
//! With no data for the day KAMIS instead sends `"data": ["001"]`.

use super::http_client::HttpClient;
use super::{PriceSource, SourceError};
use crate::config::{HttpConfig, KamisConfig};
use crate::models::{Month, PriceRecord};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

const ENDPOINT: &str = "kamis";
const CODE_OK: &str = "000";
const CODE_NO_DATA: &str = "001";

#[derive(Debug, Deserialize)]
struct KamisEnvelope {
    #[serde(default)]
    data: Option<KamisData>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum KamisData {
    Items {
        #[serde(default)]
        error_code: String,
        #[serde(default, deserialize_with = "one_or_many")]
        item: Vec<PriceRecord>,
    },
    Codes(Vec<Value>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

/// A single matching item comes back as an object rather than a one-element array.
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(v) => v,
        OneOrMany::One(t) => vec![t],
    })
}

fn upstream_error(code: &str) -> SourceError {
    let message = match code {
        "200" => "wrong request parameters",
        "900" => "unauthenticated (check cert_key / cert_id)",
        _ => "unexpected response",
    };
    SourceError::Upstream {
        endpoint: ENDPOINT.to_string(),
        code: code.to_string(),
        message: message.to_string(),
    }
}

/// Decode a KAMIS response body. "No data" is an empty list, not an error.
pub fn decode_price_list(body: &str) -> Result<Vec<PriceRecord>, SourceError> {
    let envelope: KamisEnvelope = serde_json::from_str(body)?;

    match envelope.data {
        None => Ok(vec![]),
        Some(KamisData::Items { error_code, item }) => match error_code.trim() {
            CODE_OK | "" => Ok(item),
            CODE_NO_DATA => Ok(vec![]),
            other => Err(upstream_error(other)),
        },
        Some(KamisData::Codes(codes)) => {
            let code = codes
                .first()
                .map(|c| match c {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default();
            match code.as_str() {
                CODE_NO_DATA | "" => Ok(vec![]),
                other => Err(upstream_error(other)),
            }
        }
    }
}

pub struct KamisClient {
    client: HttpClient,
    config: KamisConfig,
}

impl KamisClient {
    pub fn new(config: &KamisConfig, http: &HttpConfig) -> Result<Self, SourceError> {
        if config.cert_key.is_empty() {
            warn!("KAMIS cert_key is empty; set SEASONAL__KAMIS__CERT_KEY");
        }
        Ok(Self {
            client: HttpClient::new(http)?,
            config: config.clone(),
        })
    }

    /// Query URL for the survey day of `month`.
    pub fn request_url(&self, month: Month, year: i32) -> Result<Url, SourceError> {
        let regday = month
            .regday(year)
            .ok_or(SourceError::InvalidDate { month, year })?;
        let regday = regday.format("%Y-%m-%d").to_string();

        let c = &self.config;
        let url = Url::parse_with_params(
            &c.base_url,
            &[
                ("action", c.action.as_str()),
                ("p_cert_key", c.cert_key.as_str()),
                ("p_cert_id", c.cert_id.as_str()),
                ("p_returntype", "json"),
                ("p_product_cls_code", c.product_cls_code.as_str()),
                ("p_item_category_code", c.item_category_code.as_str()),
                ("p_country_code", c.country_code.as_str()),
                ("p_regday", regday.as_str()),
                ("p_convert_kg_yn", if c.convert_kg { "Y" } else { "N" }),
            ],
        )?;
        Ok(url)
    }
}

#[async_trait]
impl PriceSource for KamisClient {
    async fn fetch_prices(&self, month: Month, year: i32) -> Result<Vec<PriceRecord>, SourceError> {
        let url = self.request_url(month, year)?;
        let body = self.client.get_text(ENDPOINT, &url).await?;
        let records = decode_price_list(&body)?;

        info!(
            "KAMIS {} {}: {} items (category {})",
            year,
            month,
            records.len(),
            self.config.item_category_code
        );
        Ok(records)
    }
}
