use crate::domain::row::{Row, RowRecord};
use crate::ingest::provider::PredictionProvider;
use crate::ingest::UnknownTickerError;
use anyhow::Result;

pub const UNIVERSE: [&str; 4] = ["AAPL", "MSFT", "GOOG", "AMZN"];

// Assigned by selection position, not by ticker.
const PROBABILITY: [f64; 4] = [75.0, 62.0, 85.0, 55.0];
const RSI: [f64; 4] = [65.0, 48.0, 72.0, 50.0];
const MACD: [f64; 4] = [1.2, -0.5, 2.1, 0.3];

/// Static stand-in for a real prediction service.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderProvider;

impl PlaceholderProvider {
    pub fn rows(tickers: &[String]) -> Result<Vec<Row>, UnknownTickerError> {
        let mut out = Vec::with_capacity(tickers.len());
        for (i, ticker) in tickers.iter().enumerate() {
            if !UNIVERSE.contains(&ticker.as_str()) {
                return Err(UnknownTickerError(ticker.clone()));
            }
            // Repeated tickers past the fourth slot wrap around.
            let slot = i % PROBABILITY.len();
            out.push(Row::new(ticker.clone(), PROBABILITY[slot], RSI[slot], MACD[slot]));
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl PredictionProvider for PlaceholderProvider {
    fn provider_name(&self) -> &'static str {
        "placeholder"
    }

    async fn predict(&self, tickers: &[String]) -> Result<Vec<RowRecord>> {
        let rows = Self::rows(tickers)?;
        Ok(rows.iter().map(RowRecord::from).collect())
    }
}
