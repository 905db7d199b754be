// Background ingestion: runs PriceDataController::load on a cron schedule or fixed
// interval. Runs are strictly sequential inside this task; a run that exceeds
// run_timeout is dropped, which cancels its in-flight fetch or insert.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

use crate::controller::{LoadOutcome, PriceDataController};
use crate::error::PriceError;

#[derive(Debug, Clone)]
pub struct IngestWorkerConfig {
    pub interval_secs: u64,
    /// Optional cron expression; takes precedence over `interval_secs`. Uses UTC.
    pub schedule: Option<String>,
    pub run_timeout_secs: u64,
    pub run_on_startup: bool,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Load(#[from] PriceError),

    #[error("load run timed out")]
    TimedOut,
}

/// Spawns the ingestion worker. It stops when `shutdown_rx` fires.
pub fn spawn(
    controller: Arc<PriceDataController>,
    config: IngestWorkerConfig,
    shutdown_rx: oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(controller, config, shutdown_rx).await;
    })
}

#[instrument(skip(controller, shutdown_rx), fields(interval_secs = config.interval_secs))]
async fn run(
    controller: Arc<PriceDataController>,
    config: IngestWorkerConfig,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let (tick_tx, mut tick_rx) = mpsc::channel::<()>(1);
    let ticker = tokio::spawn(tick_scheduler(config.clone(), tick_tx));

    if config.run_on_startup {
        log_run(run_once(&controller, &config).await);
    }

    loop {
        tokio::select! {
            tick = tick_rx.recv() => {
                if tick.is_none() {
                    warn!("ingestion schedule ended; worker stopping");
                    break;
                }
                log_run(run_once(&controller, &config).await);
            }
            _ = &mut shutdown_rx => {
                debug!("ingest worker shutting down");
                break;
            }
        }
    }
    ticker.abort();
}

/// Sends on `tx` at each run time. A full channel means a run is still going; that tick is dropped.
async fn tick_scheduler(config: IngestWorkerConfig, tx: mpsc::Sender<()>) {
    if let Some(ref cron_str) = config.schedule {
        let Ok(schedule) = cron::Schedule::from_str(cron_str) else {
            warn!(cron = %cron_str, "invalid ingestion schedule; scheduled loads disabled");
            return;
        };
        loop {
            let now = chrono::Utc::now();
            let Some(next) = schedule.after(&now).next() else {
                return;
            };
            let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));
            tokio::time::sleep(delay).await;
            if tx.is_closed() {
                return;
            }
            let _ = tx.try_send(());
        }
    } else {
        let mut interval = tokio::time::interval(Duration::from_secs(config.interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick completes immediately; startup runs are handled by run_on_startup.
        interval.tick().await;
        loop {
            interval.tick().await;
            if tx.is_closed() {
                return;
            }
            let _ = tx.try_send(());
        }
    }
}

/// One load bounded by run_timeout. Used by the worker loop.
pub async fn run_once(
    controller: &PriceDataController,
    config: &IngestWorkerConfig,
) -> Result<LoadOutcome, RunError> {
    let timeout = Duration::from_secs(config.run_timeout_secs);
    match tokio::time::timeout(timeout, controller.load()).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(RunError::TimedOut),
    }
}

fn log_run(result: Result<LoadOutcome, RunError>) {
    match result {
        Ok(outcome) if outcome.advanced() => {
            info!(fetched = outcome.fetched, end = %outcome.end.to_rfc3339(), "scheduled load complete")
        }
        Ok(_) => debug!("scheduled load fetched nothing"),
        Err(RunError::Load(e)) => {
            warn!(error = %e, kind = e.kind(), "scheduled load failed; checkpoint unchanged")
        }
        Err(e @ RunError::TimedOut) => warn!(error = %e, "scheduled load cancelled"),
    }
}
