// Price data controller: checkpointed ingestion (load) and windowed queries (find).
//
// load() is at-least-once and takes no lock: two overlapping runs can read the same
// checkpoint and both insert the same interval. Callers serialize runs (see ingest_worker).

use std::sync::Arc;

use chrono::{DateTime, Months, SubsecRound, Utc};
use tracing::{info, instrument};

use crate::asset_client::PriceSource;
use crate::error::PriceResult;
use crate::models::{Entry, Query};
use crate::price_repo::aggregation::{sort_chronologically, translate};
use crate::price_repo::{CheckpointStore, TimeSeriesStore};

/// Look-back used when no checkpoint exists yet.
pub const BOOTSTRAP_MONTHS: u32 = 24;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// What a single load run covered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadOutcome {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub fetched: usize,
}

impl LoadOutcome {
    /// False when the fetch was empty and the checkpoint was left alone.
    pub fn advanced(&self) -> bool {
        self.fetched > 0
    }
}

pub struct PriceDataController {
    price_repo: Arc<dyn TimeSeriesStore>,
    last_update_repo: Arc<dyn CheckpointStore>,
    source: Arc<dyn PriceSource>,
    clock: Arc<dyn Clock>,
}

impl PriceDataController {
    pub fn new(
        price_repo: Arc<dyn TimeSeriesStore>,
        last_update_repo: Arc<dyn CheckpointStore>,
        source: Arc<dyn PriceSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            price_repo,
            last_update_repo,
            source,
            clock,
        }
    }

    /// Fetch everything since the checkpoint and advance it to the captured end.
    /// Any failure leaves the checkpoint untouched.
    #[instrument(skip(self), fields(operation = "load"))]
    pub async fn load(&self) -> PriceResult<LoadOutcome> {
        let checkpoint = self.last_update_repo.get().await?;

        // Captured once; stored at millisecond precision.
        let end = self.clock.now().trunc_subsecs(3);
        let start = checkpoint.unwrap_or_else(|| bootstrap_start(end));

        let entries = self.source.fetch(start, end).await?;
        let outcome = LoadOutcome {
            start,
            end,
            fetched: entries.len(),
        };
        if entries.is_empty() {
            info!(
                start = %start.to_rfc3339(),
                end = %end.to_rfc3339(),
                "no new prices; checkpoint unchanged"
            );
            return Ok(outcome);
        }

        self.price_repo.insert(&entries).await?;
        self.last_update_repo.update(end).await?;
        info!(
            start = %start.to_rfc3339(),
            end = %end.to_rfc3339(),
            fetched = entries.len(),
            "prices loaded; checkpoint advanced"
        );
        Ok(outcome)
    }

    /// Bucketed aggregates for `query`, ascending by bucket time.
    #[instrument(
        skip(self),
        fields(operation = "find", window_unit = %query.window_unit, window_interval = query.window_interval, aggregation = %query.aggregation)
    )]
    pub async fn find(&self, query: &Query) -> PriceResult<Vec<Entry>> {
        let request = translate(query)?;
        let mut entries = self.price_repo.execute_aggregation(&request).await?;
        sort_chronologically(&mut entries);
        Ok(entries)
    }
}

/// `end` minus the bootstrap depth, in calendar months.
pub fn bootstrap_start(end: DateTime<Utc>) -> DateTime<Utc> {
    end.checked_sub_months(Months::new(BOOTSTRAP_MONTHS))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
