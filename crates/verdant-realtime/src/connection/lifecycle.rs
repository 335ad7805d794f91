//! Connection lifecycle: bridges transport connect/disconnect into the
//! presence registry.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use verdant_core::config::RealtimeConfig;
use verdant_core::types::ConnectionId;

use crate::message::types::{InboundMessage, OutboundMessage};
use crate::metrics::RealtimeMetrics;
use crate::presence::registry::PresenceRegistry;

use super::authenticator::AuthenticatedConnection;
use super::handle::ConnectionHandle;
use super::heartbeat::HeartbeatConfig;
use super::pool::ConnectionPool;

/// Owns every open connection and keeps the presence registry current.
#[derive(Debug)]
pub struct ConnectionLifecycleManager {
    /// Connection pool.
    pool: ConnectionPool,
    /// Presence registry.
    presence: Arc<PresenceRegistry>,
    /// Metrics.
    metrics: Arc<RealtimeMetrics>,
    /// Configuration.
    config: RealtimeConfig,
    /// Parent of every connection's close token.
    shutdown: CancellationToken,
}

impl ConnectionLifecycleManager {
    /// Creates a new lifecycle manager.
    pub fn new(
        config: RealtimeConfig,
        presence: Arc<PresenceRegistry>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            pool: ConnectionPool::new(),
            presence,
            metrics,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Accept a new connection.
    ///
    /// Anonymous connections are pooled but never registered for presence.
    /// An authenticated connection replaces any earlier live connection for
    /// the same user. Returns the handle and the receiver the transport
    /// writer drains.
    pub fn on_connect(
        &self,
        identity: Option<AuthenticatedConnection>,
        location: Option<String>,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);

        let (user_id, username) = match identity {
            Some(identity) => (Some(identity.user_id), Some(identity.username)),
            None => (None, None),
        };

        let handle = Arc::new(ConnectionHandle::new(
            user_id,
            username.clone(),
            location,
            tx,
            self.config.send_timeout(),
            self.shutdown.child_token(),
        ));

        self.pool.add(handle.clone());
        self.metrics.connection_opened(user_id.is_some());

        if let (Some(user_id), Some(username)) = (user_id, username) {
            if self.presence.register(user_id, username, handle.clone()).is_some() {
                self.metrics.connection_replaced();
            }
            info!(
                conn_id = %handle.id,
                user_id = %user_id,
                location = ?handle.location,
                "Live connection registered"
            );
        } else {
            debug!(conn_id = %handle.id, "Anonymous live connection accepted");
        }

        (handle, rx)
    }

    /// Forget a connection after the transport closed.
    ///
    /// Always attempts presence removal; it only takes effect if this
    /// connection is still the user's live one.
    pub fn on_disconnect(&self, conn_id: &ConnectionId) {
        let Some(handle) = self.pool.remove(conn_id) else {
            return;
        };
        handle.close();

        if let Some(user_id) = handle.user_id {
            self.presence.unregister_connection(user_id, handle.id);
        }
        self.metrics.connection_closed();

        info!(
            conn_id = %conn_id,
            user_id = ?handle.user_id,
            "Live connection closed"
        );
    }

    /// Processes an inbound text frame from a client.
    pub async fn handle_inbound(&self, conn_id: &ConnectionId, raw_message: &str) {
        let Some(handle) = self.pool.get(conn_id) else {
            warn!(conn_id = %conn_id, "Message from unknown connection");
            return;
        };
        self.metrics.message_received();

        let msg: InboundMessage = match serde_json::from_str(raw_message) {
            Ok(m) => m,
            Err(e) => {
                let error_msg = OutboundMessage::Error {
                    code: "INVALID_MESSAGE".to_string(),
                    message: format!("Failed to parse message: {e}"),
                };
                handle.send_message(&error_msg).await;
                return;
            }
        };

        match msg {
            InboundMessage::Pong { .. } => handle.record_pong().await,
            InboundMessage::Ping { .. } => {
                handle.record_pong().await;
                let pong = OutboundMessage::Pong {
                    timestamp: Utc::now().timestamp(),
                };
                handle.send_message(&pong).await;
            }
        }
    }

    /// Closes every open connection and clears the presence registry.
    pub fn close_all(&self) {
        self.shutdown.cancel();
        let all = self.pool.drain();
        for conn in &all {
            conn.close();
        }
        self.presence.clear();
        info!(count = all.len(), "All live connections closed");
    }

    /// Open connections, authenticated or not.
    pub fn live_connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Heartbeat settings for connection tasks.
    pub fn heartbeat_config(&self) -> HeartbeatConfig {
        HeartbeatConfig::from(&self.config)
    }
}
