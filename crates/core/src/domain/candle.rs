use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

const SAMPLE_OPEN: [f64; 10] = [100.0, 102.0, 101.0, 103.0, 104.0, 106.0, 107.0, 108.0, 107.0, 109.0];
const SAMPLE_HIGH: [f64; 10] = [102.0, 103.0, 102.0, 104.0, 105.0, 107.0, 108.0, 109.0, 108.0, 110.0];
const SAMPLE_LOW: [f64; 10] = [99.0, 101.0, 100.0, 102.0, 103.0, 105.0, 106.0, 107.0, 106.0, 108.0];
const SAMPLE_CLOSE: [f64; 10] = [101.0, 102.0, 103.0, 104.0, 106.0, 107.0, 108.0, 107.0, 109.0, 110.0];

impl Candle {
    pub fn is_increasing(&self) -> bool {
        self.close >= self.open
    }

    /// Fixed ten consecutive days starting 2025-07-01.
    pub fn sample_session() -> Vec<Candle> {
        let start = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap_or_default();
        (0..SAMPLE_OPEN.len())
            .map(|i| Candle {
                date: start + Duration::days(i as i64),
                open: SAMPLE_OPEN[i],
                high: SAMPLE_HIGH[i],
                low: SAMPLE_LOW[i],
                close: SAMPLE_CLOSE[i],
            })
            .collect()
    }
}
