use crate::domain::row::RowRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub items: Vec<RowRecord>,
}
