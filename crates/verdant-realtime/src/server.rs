//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use verdant_auth::jwt::JwtDecoder;
use verdant_core::config::{AuthConfig, RealtimeConfig};
use verdant_database::store::NotificationMailbox;

use crate::connection::authenticator::WsAuthenticator;
use crate::connection::lifecycle::ConnectionLifecycleManager;
use crate::metrics::{MetricsSnapshot, RealtimeMetrics};
use crate::notification::dispatcher::AlertDispatcher;
use crate::notification::formatter::AlertMessageFormatter;
use crate::presence::registry::PresenceRegistry;

/// Point-in-time view of the live side of the engine.
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeStats {
    /// Users with a registered live connection.
    pub online_count: usize,
    /// Open connections, including anonymous and replaced ones.
    pub live_connection_count: usize,
    /// Counters since start.
    pub metrics: MetricsSnapshot,
}

/// Owns the presence registry and everything that reads or writes it.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection lifecycle manager.
    pub connections: Arc<ConnectionLifecycleManager>,
    /// Presence registry.
    pub presence: Arc<PresenceRegistry>,
    /// Alert dispatcher.
    pub dispatcher: Arc<AlertDispatcher>,
    /// Connection authenticator.
    pub authenticator: Arc<WsAuthenticator>,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine").finish()
    }
}

impl RealtimeEngine {
    /// Creates a new real-time engine with all subsystems.
    pub fn new(
        config: RealtimeConfig,
        auth: &AuthConfig,
        pre_notification_lead_minutes: u32,
        mailbox: Arc<dyn NotificationMailbox>,
    ) -> Self {
        let metrics = Arc::new(RealtimeMetrics::new());
        let presence = Arc::new(PresenceRegistry::new());
        let connections = Arc::new(ConnectionLifecycleManager::new(
            config,
            presence.clone(),
            metrics.clone(),
        ));
        let dispatcher = Arc::new(AlertDispatcher::new(
            presence.clone(),
            mailbox,
            AlertMessageFormatter::new(pre_notification_lead_minutes),
            metrics.clone(),
        ));
        let authenticator = Arc::new(WsAuthenticator::new(Arc::new(JwtDecoder::new(auth))));

        info!("Real-time engine initialized");

        Self {
            connections,
            presence,
            dispatcher,
            authenticator,
            metrics,
        }
    }

    /// Current counts and counters.
    pub fn stats(&self) -> RealtimeStats {
        RealtimeStats {
            online_count: self.presence.count(),
            live_connection_count: self.connections.live_connection_count(),
            metrics: self.metrics.snapshot(),
        }
    }

    /// Closes every live connection and clears the registry.
    pub fn shutdown(&self) {
        info!("Shutting down real-time engine");
        self.connections.close_all();
        info!("Real-time engine shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_core::types::UserId;
    use verdant_database::MemoryStore;

    use crate::connection::authenticator::AuthenticatedConnection;

    #[test]
    fn test_stats_and_shutdown() {
        let engine = RealtimeEngine::new(
            RealtimeConfig::default(),
            &AuthConfig::default(),
            10,
            Arc::new(MemoryStore::new()),
        );
        let identity = AuthenticatedConnection {
            user_id: UserId::new(),
            username: "ann".into(),
        };
        let (_h1, _r1) = engine.connections.on_connect(Some(identity), None);
        let (_h2, _r2) = engine.connections.on_connect(None, None);

        let stats = engine.stats();
        assert_eq!(stats.online_count, 1);
        assert_eq!(stats.live_connection_count, 2);

        engine.shutdown();
        let stats = engine.stats();
        assert_eq!(stats.online_count, 0);
        assert_eq!(stats.live_connection_count, 0);
    }
}
