// SQLite price history. price_data is append-only; samples are never updated or
// deleted here. Timestamps are epoch milliseconds.

pub mod aggregation;
pub mod checkpoint;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqlitePool;
use tracing::instrument;

use crate::error::{PriceError, PriceResult};
use crate::models::Entry;
use aggregation::AggregationRequest;

pub use checkpoint::{CheckpointStore, LastUpdateRepo};

/// Append-only sample storage plus aggregation execution.
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Append a batch. Atomic per call as far as the backing engine allows.
    async fn insert(&self, entries: &[Entry]) -> PriceResult<()>;

    /// Run a translated aggregation; one entry per non-empty bucket.
    async fn execute_aggregation(&self, request: &AggregationRequest) -> PriceResult<Vec<Entry>>;
}

pub struct PriceRepo {
    pool: SqlitePool,
}

impl PriceRepo {
    /// Wraps `pool` and runs table setup. Setup is idempotent.
    pub async fn open(pool: SqlitePool) -> PriceResult<Self> {
        let repo = Self { pool };
        repo.init().await?;
        Ok(repo)
    }

    async fn init(&self) -> PriceResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS price_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ts_ms INTEGER NOT NULL,
                price REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_price_data_ts ON price_data(ts_ms)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Raw samples in [from, to). Order: ascending by time, then insertion.
    ///
    /// Diagnostics and test support; the service itself only reads through
    /// [`TimeSeriesStore::execute_aggregation`].
    #[instrument(skip(self), fields(repo = "price", operation = "raw_entries"))]
    pub async fn raw_entries(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PriceResult<Vec<Entry>> {
        let rows = sqlx::query(
            "SELECT ts_ms, price FROM price_data WHERE ts_ms >= $1 AND ts_ms < $2 ORDER BY ts_ms ASC, id ASC",
        )
        .bind(from.timestamp_millis())
        .bind(to.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let ts_ms: i64 = row.try_get("ts_ms")?;
            let price: f64 = row.try_get("price")?;
            out.push(Entry::new(from_millis(ts_ms)?, price));
        }
        Ok(out)
    }

    /// Total stored samples. Diagnostics and test support.
    pub async fn count(&self) -> PriceResult<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM price_data")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

#[async_trait]
impl TimeSeriesStore for PriceRepo {
    #[instrument(skip(self, entries), fields(repo = "price", operation = "insert", entries_count = entries.len()))]
    async fn insert(&self, entries: &[Entry]) -> PriceResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for e in entries {
            sqlx::query("INSERT INTO price_data (ts_ms, price) VALUES ($1, $2)")
                .bind(e.time.timestamp_millis())
                .bind(e.value)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    #[instrument(
        skip(self),
        fields(repo = "price", operation = "execute_aggregation", op = %request.op, bucket_ms = request.bucket_ms)
    )]
    async fn execute_aggregation(&self, request: &AggregationRequest) -> PriceResult<Vec<Entry>> {
        let sql = request.sql();
        let rows = sqlx::query(&sql)
            .bind(request.from_ms)
            .bind(request.to_ms)
            .bind(request.bucket_ms)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let bucket: i64 = row.try_get("bucket")?;
            let value: f64 = row.try_get("agg_value")?;
            out.push(Entry::new(from_millis(bucket)?, value));
        }
        Ok(out)
    }
}

pub(crate) fn from_millis(ms: i64) -> PriceResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        PriceError::Storage(sqlx::Error::Decode(
            format!("timestamp out of range: {ms} ms").into(),
        ))
    })
}
