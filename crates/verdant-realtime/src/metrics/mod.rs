//! Realtime engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    connections_replaced: AtomicU64,
    anonymous_connections: AtomicU64,
    messages_received: AtomicU64,
    pushes_sent: AtomicU64,
    pushes_failed: AtomicU64,
    mailbox_written: AtomicU64,
    mailbox_failed: AtomicU64,
    dispatch_batches: AtomicU64,
}

impl RealtimeMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted connection; anonymous ones are also counted apart.
    pub fn connection_opened(&self, authenticated: bool) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
        if !authenticated {
            self.anonymous_connections.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a connection leaving the pool.
    pub fn connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a registration that displaced the user's previous connection.
    pub fn connection_replaced(&self) {
        self.connections_replaced.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one inbound client frame.
    pub fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one live push attempt.
    pub fn push(&self, delivered: bool) {
        let counter = if delivered {
            &self.pushes_sent
        } else {
            &self.pushes_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one mailbox append.
    pub fn mailbox(&self, written: bool) {
        let counter = if written {
            &self.mailbox_written
        } else {
            &self.mailbox_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one dispatch batch, whatever its size.
    pub fn dispatch_batch(&self) {
        self.dispatch_batches.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            connections_replaced: self.connections_replaced.load(Ordering::Relaxed),
            anonymous_connections: self.anonymous_connections.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            pushes_sent: self.pushes_sent.load(Ordering::Relaxed),
            pushes_failed: self.pushes_failed.load(Ordering::Relaxed),
            mailbox_written: self.mailbox_written.load(Ordering::Relaxed),
            mailbox_failed: self.mailbox_failed.load(Ordering::Relaxed),
            dispatch_batches: self.dispatch_batches.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Connections accepted since start
    pub connections_opened: u64,
    /// Connections closed since start
    pub connections_closed: u64,
    /// Registry entries replaced by a newer connection for the same user
    pub connections_replaced: u64,
    /// Connections accepted without an identity
    pub anonymous_connections: u64,
    /// Inbound frames processed
    pub messages_received: u64,
    /// Live pushes accepted by a connection
    pub pushes_sent: u64,
    /// Live pushes that failed or timed out
    pub pushes_failed: u64,
    /// Mailbox records written
    pub mailbox_written: u64,
    /// Mailbox appends that failed
    pub mailbox_failed: u64,
    /// Dispatch batches issued
    pub dispatch_batches: u64,
}
