// Query -> store aggregation request. Bucketing is epoch-aligned truncation;
// the SQL operator comes only from the closed Aggregation mapping below.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::{PriceError, PriceResult};
use crate::models::{Aggregation, Entry, Query};

/// A validated, store-ready aggregation over `[from_ms, to_ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationRequest {
    pub from_ms: i64,
    pub to_ms: i64,
    pub bucket_ms: i64,
    pub op: Aggregation,
}

/// SQLite aggregate function for each supported aggregation.
pub fn sql_function(op: Aggregation) -> &'static str {
    match op {
        Aggregation::Min => "MIN",
        Aggregation::Max => "MAX",
        Aggregation::Avg => "AVG",
        Aggregation::Sum => "SUM",
    }
}

/// Validates `query` and builds the request. Never touches the store.
pub fn translate(query: &Query) -> PriceResult<AggregationRequest> {
    if query.start_time >= query.end_time {
        return Err(PriceError::validation(format!(
            "start ({}) must be before end ({})",
            query.start_time.to_rfc3339(),
            query.end_time.to_rfc3339()
        )));
    }
    if query.window_interval == 0 {
        return Err(PriceError::validation("window interval must be positive"));
    }
    let bucket_ms = query
        .window_unit
        .millis()
        .checked_mul(i64::from(query.window_interval))
        .ok_or_else(|| PriceError::validation("window too large"))?;

    Ok(AggregationRequest {
        from_ms: ceil_millis(query.start_time),
        to_ms: ceil_millis(query.end_time),
        bucket_ms,
        op: query.aggregation,
    })
}

/// Samples are stored at millisecond precision; rounding both bounds up keeps
/// `[from_ms, to_ms)` equivalent to `[start, end)` over stored samples.
fn ceil_millis(t: DateTime<Utc>) -> i64 {
    let ms = t.timestamp_millis();
    if t.timestamp_subsec_nanos() % 1_000_000 != 0 {
        ms + 1
    } else {
        ms
    }
}

impl AggregationRequest {
    /// Grouped aggregate over price_data. Binds: ?1 from_ms, ?2 to_ms, ?3 bucket_ms.
    ///
    /// The bucket key is floored to a multiple of bucket_ms (correct for negative
    /// timestamps too), then clamped to from_ms so the first, partially covered
    /// bucket is reported at the range start rather than before it.
    pub fn sql(&self) -> String {
        format!(
            "SELECT MAX(ts_ms - (((ts_ms % ?3) + ?3) % ?3), ?1) AS bucket, {}(price) AS agg_value
             FROM price_data
             WHERE ts_ms >= ?1 AND ts_ms < ?2
             GROUP BY bucket
             ORDER BY bucket ASC",
            sql_function(self.op)
        )
    }

    /// Bucket key for a sample timestamp, same rule as the SQL above.
    pub fn bucket_of(&self, ts_ms: i64) -> i64 {
        (ts_ms - ts_ms.rem_euclid(self.bucket_ms)).max(self.from_ms)
    }

    /// In-memory evaluation with the same semantics as [`Self::sql`].
    ///
    /// Reference model for checking the SQL in tests; not used on the query path.
    pub fn apply(&self, entries: &[Entry]) -> Vec<Entry> {
        let mut buckets: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
        for e in entries {
            let ts = e.time.timestamp_millis();
            if ts >= self.from_ms && ts < self.to_ms {
                buckets.entry(self.bucket_of(ts)).or_default().push(e.value);
            }
        }
        buckets
            .into_iter()
            .filter_map(|(bucket, values)| {
                let time = DateTime::from_timestamp_millis(bucket)?;
                Some(Entry::new(time, fold(self.op, &values)))
            })
            .collect()
    }
}

fn fold(op: Aggregation, values: &[f64]) -> f64 {
    match op {
        Aggregation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        Aggregation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Aggregation::Sum => values.iter().sum(),
        Aggregation::Avg => {
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / (values.len() as f64)
            }
        }
    }
}

/// Chronological order is part of the Find contract, whatever the store returns.
pub fn sort_chronologically(entries: &mut [Entry]) {
    entries.sort_by_key(|e| e.time);
}
