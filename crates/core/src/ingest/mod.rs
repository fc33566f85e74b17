pub mod placeholder;
pub mod provider;
pub mod types;

pub use placeholder::PlaceholderProvider;
pub use provider::{HttpJsonPredictionProvider, PredictionProvider};

use crate::config::Settings;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_TICKERS: [&str; 1] = ["AAPL"];

#[derive(Debug, Error)]
#[error("unknown ticker: {0}")]
pub struct UnknownTickerError(pub String);

/// `"aapl, MSFT,,aapl"` → `["AAPL", "MSFT"]`. First occurrence wins.
pub fn parse_tickers(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in raw.split(',') {
        let ticker = part.trim().to_ascii_uppercase();
        if ticker.is_empty() || out.contains(&ticker) {
            continue;
        }
        out.push(ticker);
    }
    out
}

pub fn default_tickers() -> Vec<String> {
    DEFAULT_TICKERS.iter().map(|s| s.to_string()).collect()
}

/// HTTP provider when `PREDICTION_PROVIDER_BASE_URL` is set, the static table otherwise.
pub fn provider_from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn PredictionProvider>> {
    if settings.prediction_provider_base_url.is_some() {
        return Ok(Arc::new(HttpJsonPredictionProvider::from_settings(settings)?));
    }
    Ok(Arc::new(PlaceholderProvider))
}
