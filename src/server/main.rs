use std::sync::Arc;

use axum::middleware;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};

use coupons::config::init_config;
use coupons::jobs::{JobConfig, JobScheduler, StatusUpdater};
use coupons::server::{build_router, request_logging_middleware, AppState, Database};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = init_config()?;

    // Initialize logging
    if config.logging.enabled {
        let level = config
            .logging
            .level
            .parse::<Level>()
            .unwrap_or(Level::INFO);
        tracing_subscriber::fmt().with_max_level(level).init();
    }

    let db = Database::new().await?;
    db.ensure_schema().await?;
    info!("Connected to {} database", db.db_type());

    let updater = Arc::new(
        StatusUpdater::new(Arc::clone(&db)).with_pass_timeout(config.jobs.pass_timeout()),
    );

    let mut scheduler = if config.jobs.enabled {
        let scheduler =
            JobScheduler::new(Arc::clone(&updater), JobConfig::from(&config.jobs)).await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        warn!("Interval scheduler disabled; passes only run via the trigger endpoint");
        None
    };

    let trigger_secret = config.trigger.resolved_secret()?;
    if trigger_secret.is_none() {
        warn!("No trigger secret configured; the status trigger endpoint is open");
    }

    let app = build_router(AppState::new(updater, trigger_secret))
        .layer(middleware::from_fn(request_logging_middleware));

    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scheduler) = scheduler.as_mut() {
        scheduler.shutdown().await?;
    }

    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
