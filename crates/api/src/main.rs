use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};

use homeservices_api::app;
use homeservices_api::config::{Config, StorageBackend};
use homeservices_api::jobs::{DeliveryLogCleanupJob, JobScheduler, PoolMetricsJob, WebhookRetryJob};
use homeservices_api::middleware::{init_logging, init_metrics};
use homeservices_api::services::{EngineSettings, HttpTransport, WebhookEngine};
use persistence::Stores;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    init_logging(&config.logging).context("Failed to initialize logging")?;
    init_metrics().context("Failed to initialize metrics")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        storage = ?config.storage.backend,
        "Starting home-services webhook engine"
    );

    let (stores, pool) = match config.storage.backend {
        StorageBackend::Memory => (Stores::in_memory(), None),
        StorageBackend::Postgres => {
            let db_config: persistence::db::DatabaseConfig = (&config.database).into();
            let pool = persistence::db::create_pool(&db_config).await?;
            info!("Running database migrations...");
            persistence::db::run_migrations(&pool).await?;
            info!("Migrations completed");
            (Stores::postgres(pool.clone()), Some(pool))
        }
    };

    let transport = HttpTransport::new(
        Duration::from_secs(config.delivery.request_timeout_secs),
        &config.delivery.user_agent,
    )
    .context("Failed to build HTTP client")?;
    let engine = Arc::new(WebhookEngine::new(
        stores,
        Arc::new(transport),
        EngineSettings::from_config(&config.delivery),
    ));

    let mut scheduler = JobScheduler::new();
    scheduler.register(WebhookRetryJob::new(
        Arc::clone(&engine),
        config.delivery.retry_scan_interval_secs,
    ));
    scheduler.register(DeliveryLogCleanupJob::new(
        Arc::clone(&engine),
        config.delivery.log_retention_days,
    ));
    if let Some(pool) = &pool {
        scheduler.register(PoolMetricsJob::new(pool.clone()));
    }
    scheduler.start();

    let addr = config.socket_addr()?;
    let app = app::create_app(config, Arc::clone(&engine), pool);

    info!(%addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(30)).await;

    info!("Waiting for in-flight deliveries");
    engine.drain().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
