// Ingestion checkpoint: one row (id = 1) holding the time through which
// ingestion is known complete. NULL means never ingested.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use tracing::instrument;

use super::from_millis;
use crate::error::PriceResult;

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Last recorded checkpoint; `None` when nothing has been ingested yet.
    async fn get(&self) -> PriceResult<Option<DateTime<Utc>>>;

    /// Upsert the checkpoint to `t`.
    async fn update(&self, t: DateTime<Utc>) -> PriceResult<()>;
}

pub struct LastUpdateRepo {
    pool: SqlitePool,
}

impl LastUpdateRepo {
    pub async fn open(pool: SqlitePool) -> PriceResult<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS last_update (id INTEGER PRIMARY KEY CHECK (id = 1), last_update_ms INTEGER)",
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl CheckpointStore for LastUpdateRepo {
    #[instrument(skip(self), fields(repo = "last_update", operation = "get"))]
    async fn get(&self) -> PriceResult<Option<DateTime<Utc>>> {
        let row = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT last_update_ms FROM last_update WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(Some(ms)) => Ok(Some(from_millis(ms)?)),
            Some(None) => Ok(None),
            None => {
                // First run: create the singleton row lazily.
                sqlx::query("INSERT OR IGNORE INTO last_update (id, last_update_ms) VALUES (1, NULL)")
                    .execute(&self.pool)
                    .await?;
                Ok(None)
            }
        }
    }

    #[instrument(skip(self), fields(repo = "last_update", operation = "update"))]
    async fn update(&self, t: DateTime<Utc>) -> PriceResult<()> {
        sqlx::query(
            "INSERT INTO last_update (id, last_update_ms) VALUES (1, $1)
             ON CONFLICT(id) DO UPDATE SET last_update_ms = excluded.last_update_ms",
        )
        .bind(t.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
