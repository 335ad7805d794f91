//! Verdant Server: irrigation alert scheduling and live notification dispatch.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use verdant_api::AppState;
use verdant_core::clock::SystemClock;
use verdant_core::config::AppConfig;
use verdant_core::error::AppError;
use verdant_database::StoreHandles;
use verdant_realtime::server::RealtimeEngine;
use verdant_worker::jobs::presence_snapshot::PresenceSnapshotJob;
use verdant_worker::{AlertScheduler, MaintenanceScheduler};

#[tokio::main]
async fn main() {
    let env = std::env::var("VERDANT_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Verdant v{}", env!("CARGO_PKG_VERSION"));
    let config = Arc::new(config);

    // ── Step 1: Storage collaborators ────────────────────────────
    let stores = StoreHandles::open(&config.database).await?;

    // ── Step 2: Realtime engine ──────────────────────────────────
    let realtime = Arc::new(RealtimeEngine::new(
        config.realtime.clone(),
        &config.auth,
        config.scheduler.pre_notification_lead_minutes,
        stores.mailbox.clone(),
    ));

    // ── Step 3: Alert scheduler ──────────────────────────────────
    let scheduler = Arc::new(AlertScheduler::new(
        stores.alerts.clone(),
        realtime.dispatcher.clone(),
        realtime.presence.clone(),
        Arc::new(SystemClock),
        &config.scheduler,
    ));
    if config.scheduler.enabled {
        scheduler.start().await;
    } else {
        tracing::warn!("Alert scheduler disabled by configuration");
    }

    // ── Step 4: Maintenance jobs ─────────────────────────────────
    let maintenance = match &config.scheduler.presence_snapshot_path {
        Some(path) => {
            let maintenance = MaintenanceScheduler::new().await?;
            maintenance
                .register_presence_snapshot(
                    PresenceSnapshotJob::new(realtime.presence.clone(), path),
                    &config.scheduler.presence_snapshot_cron,
                )
                .await?;
            maintenance.start().await?;
            Some(maintenance)
        }
        None => None,
    };

    // ── Step 5: HTTP server until shutdown ───────────────────────
    let state = AppState::new(
        config.clone(),
        realtime.clone(),
        scheduler,
        stores.pool.clone(),
    );
    let on_signal = state.clone();
    let served = verdant_api::serve(state.clone(), async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        // Ticks stop on the same signal that closes live sockets.
        on_signal.shutdown().await;
    })
    .await;

    // ── Step 6: Graceful shutdown ────────────────────────────────
    // Covers a server that failed before any signal arrived.
    state.shutdown().await;
    if let Some(maintenance) = maintenance {
        if let Err(e) = maintenance.shutdown().await {
            tracing::warn!(error = %e, "Maintenance scheduler shutdown failed");
        }
    }
    stores.close().await;

    tracing::info!("Verdant server stopped");
    served
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
