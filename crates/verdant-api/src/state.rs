//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Instant;

use verdant_core::config::AppConfig;
use verdant_database::DatabasePool;
use verdant_realtime::server::RealtimeEngine;
use verdant_worker::scheduler::AlertScheduler;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Live connections, presence and dispatch
    pub realtime: Arc<RealtimeEngine>,
    /// Alert tick loop
    pub scheduler: Arc<AlertScheduler>,
    /// PostgreSQL pool; `None` with the in-memory store
    pub db_pool: Option<DatabasePool>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Bundle the shared components.
    pub fn new(
        config: Arc<AppConfig>,
        realtime: Arc<RealtimeEngine>,
        scheduler: Arc<AlertScheduler>,
        db_pool: Option<DatabasePool>,
    ) -> Self {
        Self {
            config,
            realtime,
            scheduler,
            db_pool,
            started_at: Instant::now(),
        }
    }

    /// Stop ticking, then close every live connection.
    ///
    /// A tick already in flight finishes against the registry as it was;
    /// no tick starts after this returns. Calling it again is a no-op.
    pub async fn shutdown(&self) {
        self.scheduler.stop().await;
        self.realtime.shutdown();
    }
}
