use super::SourceError;
use crate::config::HttpConfig;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, warn};
use url::Url;

pub struct HttpClient {
    inner: reqwest::Client,
    config: HttpConfig,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, SourceError> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            inner,
            config: config.clone(),
        })
    }

    /// GET `url` and return the body, retrying transient failures with backoff.
    /// `endpoint` names the call in logs; the URL itself carries credentials.
    pub async fn get_text(&self, endpoint: &str, url: &Url) -> Result<String, SourceError> {
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(self.config.retry_base_ms.max(1))
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.config.max_retries);

        RetryIf::start(
            strategy,
            || self.get_once(endpoint, url),
            |e: &SourceError| {
                let retry = e.is_transient();
                if retry {
                    warn!("{}: {}, retrying", endpoint, e);
                }
                retry
            },
        )
        .await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, url: &Url) -> Result<T, SourceError> {
        let body = self.get_text(endpoint, url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_once(&self, endpoint: &str, url: &Url) -> Result<String, SourceError> {
        debug!("GET {}", endpoint);
        let resp = self.inner.get(url.clone()).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp.text().await?)
    }
}
