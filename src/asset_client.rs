// External price source. One GET per interval:
//   GET {server_addr}?start=YYYY-MM-DDTHH:MM:SS&end=YYYY-MM-DDTHH:MM:SS   (UTC)
// Body: { "result": [ { "time": <unix seconds>, "value": <float> } ] }
// No retry and no pagination: a truncated response is taken as complete.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use tracing::instrument;

use crate::error::{PriceError, PriceResult};
use crate::models::Entry;
use crate::version;

/// Query-parameter timestamp format expected by the source.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Samples in `[start, end)`, in whatever order the source returns them.
    async fn fetch(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> PriceResult<Vec<Entry>>;
}

#[derive(Debug, Deserialize)]
struct SourceResponse {
    /// `null` is an empty fetch; a missing key is still a decode failure.
    #[serde(deserialize_with = "null_as_empty")]
    result: Vec<SourceEntry>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<SourceEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<SourceEntry>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Deserialize)]
struct SourceEntry {
    time: i64,
    value: f64,
}

pub struct AssetClient {
    server_addr: String,
    client: reqwest::Client,
}

impl AssetClient {
    pub fn new(server_addr: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .user_agent(version::user_agent())
            .build()?;
        Ok(Self {
            server_addr: server_addr.into(),
            client,
        })
    }
}

#[async_trait]
impl PriceSource for AssetClient {
    #[instrument(skip(self), fields(source = %self.server_addr, operation = "fetch"))]
    async fn fetch(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> PriceResult<Vec<Entry>> {
        let params = [
            ("start", start.format(DATE_FORMAT).to_string()),
            ("end", end.format(DATE_FORMAT).to_string()),
        ];
        let response = self
            .client
            .get(&self.server_addr)
            .query(&params)
            .send()
            .await
            .map_err(|e| PriceError::SourceUnavailable(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(PriceError::SourceUnavailable(format!(
                "unexpected status code: {}",
                status.as_u16()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| PriceError::SourceUnavailable(e.to_string()))?;
        let entries = decode_body(&body)?;
        tracing::debug!(entries_count = entries.len(), "price source fetch complete");
        Ok(entries)
    }
}

/// Decodes a source body into UTC entries.
pub fn decode_body(body: &[u8]) -> PriceResult<Vec<Entry>> {
    let parsed: SourceResponse =
        serde_json::from_slice(body).map_err(|e| PriceError::Decode(e.to_string()))?;
    parsed
        .result
        .into_iter()
        .map(|e| {
            DateTime::from_timestamp(e.time, 0)
                .map(|time| Entry::new(time, e.value))
                .ok_or_else(|| PriceError::Decode(format!("time out of range: {}", e.time)))
        })
        .collect()
}
