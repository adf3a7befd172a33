//! Solace presence engine daemon.
//!
//! Wires the durable profile store, the realtime presence store, the
//! propagation trigger and the drift sweep together and runs until a
//! shutdown signal arrives. Listener sessions are attached by the
//! session layer at sign-in; this process hosts the server-side half of
//! presence reconciliation.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use solace_core::config::AppConfig;
use solace_core::error::AppError;
use solace_database::repositories::ListenerRepository;
use solace_entity::listener::store::ProfileStore;
use solace_entity::presence::store::PresenceStore;
use solace_realtime::{MemoryPresenceStore, PresencePropagator};
use solace_worker::{CronScheduler, PresenceSweepHandler};

#[tokio::main]
async fn main() {
    let env = std::env::var("SOLACE_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main run function.
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(
        "Starting Solace presence engine v{}",
        env!("CARGO_PKG_VERSION")
    );

    // ── Step 1: Database connection + migrations ─────────────────
    let db_pool = solace_database::DatabasePool::connect(&config.database).await?;
    solace_database::migration::run_migrations(db_pool.pool()).await?;

    // ── Step 2: Stores ───────────────────────────────────────────
    let profiles: Arc<dyn ProfileStore> =
        Arc::new(ListenerRepository::new(db_pool.pool().clone()));
    let presence = Arc::new(MemoryPresenceStore::new(config.presence.change_buffer_size));
    tracing::info!("Stores initialized");

    // ── Step 3: Shutdown channel ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 4: Propagation trigger ──────────────────────────────
    let propagator = Arc::new(PresencePropagator::new(Arc::clone(&profiles)));
    let propagator_handle = propagator.spawn(presence.changes(), shutdown_rx.clone());
    tracing::info!("Presence propagation trigger started");

    // ── Step 5: Drift sweep scheduler ────────────────────────────
    let scheduler = if config.worker.enabled {
        let sweep = Arc::new(PresenceSweepHandler::new(
            Arc::clone(&profiles),
            presence.clone() as Arc<dyn PresenceStore>,
            config.presence.stale_after_minutes,
        ));

        let scheduler = CronScheduler::new().await?;
        scheduler
            .register(&config.worker.sweep_schedule, sweep)
            .await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Background worker disabled");
        None
    };

    tracing::info!("Solace presence engine running");

    // ── Step 6: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
    let _ = shutdown_tx.send(true);

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await?;
    }
    let _ = tokio::time::timeout(std::time::Duration::from_secs(10), propagator_handle).await;

    db_pool.close().await;
    tracing::info!("Solace presence engine shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
