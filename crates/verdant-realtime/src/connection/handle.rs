//! Individual live connection handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use verdant_core::types::{ConnectionId, UserId};

use crate::message::types::OutboundMessage;

/// A handle to a single live connection.
///
/// Holds the bounded sender feeding the transport writer, plus metadata
/// about the (optional) identity attached at handshake time.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// User who owns this connection, `None` for anonymous connections
    pub user_id: Option<UserId>,
    /// Username (cached for display)
    pub username: Option<String>,
    /// Free-form location tag supplied by the client
    pub location: Option<String>,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Last pong received
    last_pong: RwLock<DateTime<Utc>>,
    /// Whether the connection is still alive
    alive: AtomicBool,
    /// Sender for outbound text frames
    sender: mpsc::Sender<String>,
    /// Upper bound on waiting for queue space
    send_timeout: Duration,
    /// Cancelled when the server closes this connection
    cancel: CancellationToken,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(
        user_id: Option<UserId>,
        username: Option<String>,
        location: Option<String>,
        sender: mpsc::Sender<String>,
        send_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ConnectionId::new(),
            user_id,
            username,
            location,
            connected_at: now,
            last_pong: RwLock::new(now),
            alive: AtomicBool::new(true),
            sender,
            send_timeout,
            cancel,
        }
    }

    /// Queue a text frame for this connection.
    ///
    /// Waits at most `send_timeout` for queue space. Returns `false` on
    /// timeout or when the transport is gone; never panics.
    pub async fn send(&self, text: String) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.send_timeout(text, self.send_timeout).await {
            Ok(()) => true,
            Err(mpsc::error::SendTimeoutError::Timeout(_)) => {
                warn!(
                    conn_id = %self.id,
                    timeout_ms = self.send_timeout.as_millis() as u64,
                    "Connection send buffer full, dropping message"
                );
                false
            }
            Err(mpsc::error::SendTimeoutError::Closed(_)) => {
                debug!(conn_id = %self.id, "Connection writer gone, marking dead");
                self.mark_dead();
                false
            }
        }
    }

    /// Serialize and queue a message.
    pub async fn send_message(&self, msg: &OutboundMessage) -> bool {
        match msg.to_text() {
            Ok(text) => self.send(text).await,
            Err(e) => {
                warn!(conn_id = %self.id, error = %e, "Failed to serialize outbound message");
                false
            }
        }
    }

    /// Whether an identity is attached.
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Mark dead and signal the transport task to close.
    pub fn close(&self) {
        self.mark_dead();
        self.cancel.cancel();
    }

    /// Resolves once the connection has been closed server-side.
    pub async fn closed(&self) {
        self.cancel.cancelled().await;
    }

    /// Whether the server has closed this connection.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Record a pong response
    pub async fn record_pong(&self) {
        let mut lp = self.last_pong.write().await;
        *lp = Utc::now();
    }

    /// Time of the most recent pong (or of the handshake).
    pub async fn last_pong(&self) -> DateTime<Utc> {
        *self.last_pong.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(buffer: usize) -> (ConnectionHandle, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer);
        let handle = ConnectionHandle::new(
            Some(UserId::new()),
            Some("alice".into()),
            None,
            tx,
            Duration::from_millis(50),
            CancellationToken::new(),
        );
        (handle, rx)
    }

    #[tokio::test]
    async fn test_send_delivers() {
        let (handle, mut rx) = handle(4);
        assert!(handle.send("hello".into()).await);
        assert_eq!(rx.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_buffer_times_out() {
        let (handle, _rx) = handle(1);
        assert!(handle.send("one".into()).await);
        assert!(!handle.send("two".into()).await);
        assert!(handle.is_alive());
    }

    #[tokio::test]
    async fn test_closed_receiver_marks_dead() {
        let (handle, rx) = handle(1);
        drop(rx);
        assert!(!handle.send("x".into()).await);
        assert!(!handle.is_alive());
        assert!(!handle.send("y".into()).await);
    }

    #[tokio::test]
    async fn test_close_cancels() {
        let (handle, _rx) = handle(1);
        handle.close();
        assert!(handle.is_closed());
        handle.closed().await;
        assert!(!handle.is_alive());
    }
}
