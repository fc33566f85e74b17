use crate::report::error::ReportError;
use serde::{Deserialize, Serialize};

/// One ticker's prediction record, validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub symbol: String,
    pub probability: f64,
    pub rsi: f64,
    pub macd: f64,
}

/// Row as delivered by a prediction provider: nothing is guaranteed present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowRecord {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub probability: Option<f64>,
    #[serde(default)]
    pub rsi: Option<f64>,
    #[serde(default)]
    pub macd: Option<f64>,
}

impl Row {
    pub fn new(symbol: impl Into<String>, probability: f64, rsi: f64, macd: f64) -> Self {
        Self {
            symbol: symbol.into(),
            probability,
            rsi,
            macd,
        }
    }

    /// `AAPL: Gap-Up Probability 75% | RSI 65 | MACD 1.2`
    pub fn summary_line(&self) -> String {
        format!(
            "{}: Gap-Up Probability {}% | RSI {} | MACD {}",
            self.symbol,
            format_number(self.probability),
            format_number(self.rsi),
            format_number(self.macd)
        )
    }
}

impl From<&Row> for RowRecord {
    fn from(row: &Row) -> Self {
        Self {
            symbol: Some(row.symbol.clone()),
            probability: Some(row.probability),
            rsi: Some(row.rsi),
            macd: Some(row.macd),
        }
    }
}

impl RowRecord {
    pub fn validate_and_into_row(&self, index: usize) -> Result<Row, ReportError> {
        let symbol = self
            .symbol
            .as_deref()
            .ok_or_else(|| ReportError::missing_field(index, "symbol"))?
            .trim();
        if symbol.is_empty() {
            return Err(ReportError::MalformedRow {
                index,
                field: "symbol",
                reason: "is blank",
            });
        }

        Ok(Row {
            symbol: symbol.to_string(),
            probability: number(index, "probability", self.probability)?,
            rsi: number(index, "rsi", self.rsi)?,
            macd: number(index, "macd", self.macd)?,
        })
    }
}

fn number(index: usize, field: &'static str, value: Option<f64>) -> Result<f64, ReportError> {
    let value = value.ok_or_else(|| ReportError::missing_field(index, field))?;
    if !value.is_finite() {
        return Err(ReportError::MalformedRow {
            index,
            field,
            reason: "is not a finite number",
        });
    }
    Ok(value)
}

/// Converts provider records into rows, preserving order. The first bad record aborts.
pub fn validate_rows(records: &[RowRecord]) -> Result<Vec<Row>, ReportError> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| record.validate_and_into_row(index))
        .collect()
}

/// Shortest decimal that reads back as the same value: `75`, `1.2`, `-0.5`.
pub fn format_number(value: f64) -> String {
    format!("{value}")
}
