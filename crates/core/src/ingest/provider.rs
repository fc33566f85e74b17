use crate::config::Settings;
use crate::domain::row::RowRecord;
use crate::ingest::types::PredictionResponse;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PATH: &str = "/v1/gapup_predictions";
const DEFAULT_RETRIES: u32 = 3;

/// Given tickers, return one row per ticker in the requested order.
#[async_trait::async_trait]
pub trait PredictionProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn predict(&self, tickers: &[String]) -> Result<Vec<RowRecord>>;
}

#[derive(Debug, Clone)]
pub struct HttpJsonPredictionProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    path: String,
    retries: u32,
}

impl HttpJsonPredictionProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_prediction_provider_base_url()?.to_string();
        let api_key = settings.prediction_provider_api_key.clone();

        let timeout_secs = std::env::var("PREDICTION_PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("PREDICTION_PROVIDER_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES)
            .max(1);

        let path = std::env::var("PREDICTION_PROVIDER_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PATH.to_string());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build prediction provider http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
            path,
            retries,
        })
    }

    fn url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };

        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }

    async fn fetch_once(&self, tickers: &[String]) -> Result<PredictionResponse> {
        let res = self
            .http
            .get(self.url())
            .headers(self.headers()?)
            .query(&[("tickers", tickers.join(","))])
            .send()
            .await
            .context("prediction provider request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read prediction provider response")?;
        let raw_json = serde_json::from_str::<Value>(&text)
            .with_context(|| format!("provider response is not valid JSON: {text}"))?;

        if !status.is_success() {
            anyhow::bail!("prediction provider HTTP {status}: {raw_json}");
        }

        serde_json::from_value::<PredictionResponse>(raw_json)
            .context("failed to parse provider response into PredictionResponse")
    }
}

#[async_trait::async_trait]
impl PredictionProvider for HttpJsonPredictionProvider {
    fn provider_name(&self) -> &'static str {
        "external_http_json"
    }

    async fn predict(&self, tickers: &[String]) -> Result<Vec<RowRecord>> {
        if tickers.is_empty() {
            return Ok(Vec::new());
        }

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(tickers).await {
                Ok(parsed) => return Ok(parsed.items),
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(attempt, ?backoff, error = %err, "prediction fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}
