//! Cashdesk API Server
//!
//! Main entry point for the ledger service.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cashdesk_api::{AppState, create_router};
use cashdesk_core::aggregation::DailyAggregator;
use cashdesk_core::audit::AuditQueue;
use cashdesk_core::clock::{Clock, SystemClock};
use cashdesk_core::ledger::LedgerSettings;
use cashdesk_core::store::LedgerStore;
use cashdesk_db::{PgStore, connect};
use cashdesk_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cashdesk=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;
    let tz = config.aggregation.tz()?;
    let run_at = config.aggregation.run_at_time()?;

    let db = connect(&config.database).await?;
    info!("Connected to database");

    let store = Arc::new(PgStore::detect(db, config.database.use_transactions).await);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let (audit, audit_worker) = AuditQueue::spawn(store.clone(), config.ledger.audit_queue_capacity);

    // Daily aggregation timer
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let aggregator = DailyAggregator::new(store.clone(), Arc::clone(&clock), tz, run_at);
    let aggregation = tokio::spawn(async move { aggregator.run_scheduled(shutdown_rx).await });
    info!(run_at = %run_at, timezone = %tz, "Daily aggregation scheduled");

    let ledger_store: Arc<dyn LedgerStore> = store;
    let state = AppState::new(ledger_store, audit, clock, LedgerSettings::from(&config.ledger), tz);
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, draining background tasks");
    let _ = shutdown_tx.send(true);
    aggregation.await?;
    // The router held the last audit senders; the worker exits once the queue drains.
    audit_worker.await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
