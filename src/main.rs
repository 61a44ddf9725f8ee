//! EventPass
//!
//! Main application entry point

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, error, info, warn};

use EventPass::{
    config::Settings,
    database::{create_pool, health_check, run_migrations, PgStore},
    services::{NotificationService, ServiceFactory},
    utils::{clock::SystemClock, logging},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before reading EVENTPASS__* variables
    if let Err(e) = dotenv::dotenv() {
        eprintln!("No .env file loaded: {}", e);
    }

    let settings = Settings::new().context("Failed to load configuration")?;
    settings.validate().context("Invalid configuration")?;

    // Keep the guard alive so the file appender flushes on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", EventPass::info());
    if let Ok(rendered) = settings.to_redacted_toml() {
        debug!("Effective configuration:\n{}", rendered);
    }

    info!("Connecting to database...");
    let pool = create_pool(&settings.database).await?;
    run_migrations(&pool).await?;
    health_check(&pool).await?;

    let store = Arc::new(PgStore::new(pool.clone()));

    let (notifications, worker) = NotificationService::start(&settings.notifications, store.clone())?;
    let services = ServiceFactory::new(store, &settings, Arc::new(SystemClock), notifications);

    info!(
        ticket_prefix = %settings.tickets.prefix,
        "EventPass admission engine is ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received, draining notifications...");

    // Dropping the last queue handle lets the worker finish
    drop(services);
    match worker.await {
        Ok(stats) => info!(
            sent = stats.total_sent,
            skipped = stats.total_skipped,
            failed = stats.total_failed,
            "Notification worker drained"
        ),
        Err(e) => error!(error = %e, "Notification worker panicked"),
    }

    pool.close().await;
    warn!("EventPass has been shut down.");

    Ok(())
}
