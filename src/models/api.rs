// HTTP request/response bodies for LoadData and FindData, and the mapping to Query.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Aggregation, Entry, Query};
use crate::error::{PriceError, PriceResult};
use crate::window::parse_window;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadDataResponse {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindDataRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Window spec, e.g. "15m".
    pub window: String,
    /// MIN / AVG / MAX / SUM. Missing means unspecified, which is rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<String>,
}

impl FindDataRequest {
    /// Parse window and aggregation. Range checks happen in the translator.
    pub fn to_query(&self) -> PriceResult<Query> {
        let (window_unit, window_interval) = parse_window(&self.window)?;
        let aggregation: Aggregation = match self.aggregation.as_deref() {
            Some(s) => s.parse()?,
            None => return Err(PriceError::validation("aggregation is unspecified")),
        };
        Ok(Query {
            start_time: self.start,
            end_time: self.end,
            window_unit,
            window_interval,
            aggregation,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindDataResponse {
    pub prices: Vec<Entry>,
}

impl From<Vec<Entry>> for FindDataResponse {
    fn from(prices: Vec<Entry>) -> Self {
        Self { prices }
    }
}
