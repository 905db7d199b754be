// Shared test helpers: temp SQLite repos, fake price source, fake store, fixed clocks
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use pricetracker::asset_client::PriceSource;
use pricetracker::controller::{Clock, PriceDataController};
use pricetracker::error::{PriceError, PriceResult};
use pricetracker::models::Entry;
use pricetracker::price_repo::aggregation::AggregationRequest;
use pricetracker::price_repo::{LastUpdateRepo, PriceRepo, TimeSeriesStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::Barrier;

pub fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

pub fn entry(t: DateTime<Utc>, value: f64) -> Entry {
    Entry::new(t, value)
}

/// Both repos on one fresh SQLite file. Keep the TempDir alive for the test's duration.
pub async fn temp_repos() -> (TempDir, Arc<PriceRepo>, Arc<LastUpdateRepo>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("prices.db");
    let pool = pricetracker::db::connect(path.to_str().unwrap(), 4)
        .await
        .unwrap();
    let price_repo = Arc::new(PriceRepo::open(pool.clone()).await.unwrap());
    let last_update_repo = Arc::new(LastUpdateRepo::open(pool).await.unwrap());
    (dir, price_repo, last_update_repo)
}

/// Always returns the same instant.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Returns `start`, then `start + step`, ... on successive calls.
pub struct StepClock {
    start: DateTime<Utc>,
    step: Duration,
    calls: AtomicUsize,
}

impl StepClock {
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            start,
            step,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) as i32;
        self.start + self.step * n
    }
}

pub enum SourceMode {
    Entries(Vec<Entry>),
    Unavailable,
    Decode,
}

/// In-memory price source. Returns the configured samples that fall in [start, end).
pub struct FakeSource {
    mode: SourceMode,
    calls: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
    barrier: Option<Barrier>,
    delay: Option<std::time::Duration>,
}

impl FakeSource {
    pub fn new(mode: SourceMode) -> Self {
        Self {
            mode,
            calls: Mutex::new(Vec::new()),
            barrier: None,
            delay: None,
        }
    }

    pub fn with_entries(entries: Vec<Entry>) -> Self {
        Self::new(SourceMode::Entries(entries))
    }

    /// Every fetch waits until `n` fetches are in flight.
    pub fn with_barrier(mut self, n: usize) -> Self {
        self.barrier = Some(Barrier::new(n));
        self
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceSource for FakeSource {
    async fn fetch(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> PriceResult<Vec<Entry>> {
        self.calls.lock().unwrap().push((start, end));
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.mode {
            SourceMode::Entries(entries) => Ok(entries
                .iter()
                .filter(|e| e.time >= start && e.time < end)
                .copied()
                .collect()),
            SourceMode::Unavailable => Err(PriceError::SourceUnavailable(
                "unexpected status code: 503".into(),
            )),
            SourceMode::Decode => Err(PriceError::Decode("expected value".into())),
        }
    }
}

/// Store double: counts calls, returns canned aggregation rows as-is, optionally fails inserts.
pub struct RecordingStore {
    pub canned: Vec<Entry>,
    pub fail_insert: bool,
    pub insert_calls: AtomicUsize,
    pub aggregation_calls: AtomicUsize,
    pub last_request: Mutex<Option<AggregationRequest>>,
}

impl RecordingStore {
    pub fn new(canned: Vec<Entry>) -> Self {
        Self {
            canned,
            fail_insert: false,
            insert_calls: AtomicUsize::new(0),
            aggregation_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn failing_inserts() -> Self {
        Self {
            fail_insert: true,
            ..Self::new(vec![])
        }
    }

    pub fn total_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst) + self.aggregation_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TimeSeriesStore for RecordingStore {
    async fn insert(&self, _entries: &[Entry]) -> PriceResult<()> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_insert {
            return Err(PriceError::Storage(sqlx::Error::PoolClosed));
        }
        Ok(())
    }

    async fn execute_aggregation(&self, request: &AggregationRequest) -> PriceResult<Vec<Entry>> {
        self.aggregation_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(*request);
        Ok(self.canned.clone())
    }
}

/// Controller over real SQLite repos with the given source and clock.
pub async fn sqlite_controller(
    source: Arc<FakeSource>,
    clock: Arc<dyn Clock>,
) -> (
    TempDir,
    Arc<PriceRepo>,
    Arc<LastUpdateRepo>,
    PriceDataController,
) {
    let (dir, price_repo, last_update_repo) = temp_repos().await;
    let controller = PriceDataController::new(
        price_repo.clone(),
        last_update_repo.clone(),
        source,
        clock,
    );
    (dir, price_repo, last_update_repo, controller)
}
