use anyhow::Result;
use pricetracker::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(name = version::NAME, version = version::VERSION, "starting");

    let pool = db::connect(&app_config.database.path, app_config.database.max_pool_size).await?;
    let price_repo = Arc::new(price_repo::PriceRepo::open(pool.clone()).await?);
    let last_update_repo = Arc::new(price_repo::LastUpdateRepo::open(pool).await?);
    let source = Arc::new(asset_client::AssetClient::new(
        app_config.source.server_addr.clone(),
        Duration::from_secs(app_config.source.timeout_secs),
    )?);
    let controller = Arc::new(controller::PriceDataController::new(
        price_repo,
        last_update_repo,
        source,
        Arc::new(controller::SystemClock),
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let worker_handle = if app_config.ingestion.enabled {
        let ingestion = &app_config.ingestion;
        Some(ingest_worker::spawn(
            controller.clone(),
            ingest_worker::IngestWorkerConfig {
                interval_secs: ingestion.interval_secs,
                schedule: ingestion.schedule.clone(),
                run_timeout_secs: ingestion.run_timeout_secs,
                run_on_startup: ingestion.run_on_startup,
            },
            shutdown_rx,
        ))
    } else {
        tracing::info!("ingestion scheduler disabled; use POST /api/prices/load");
        None
    };

    let app = routes::app(controller);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            if let Some(handle) = worker_handle {
                let _ = handle.await;
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
