//! Presence registry: at most one live connection per user.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use verdant_core::types::{ConnectionId, UserId};

use crate::connection::handle::ConnectionHandle;
use crate::message::types::OutboundMessage;

/// The registered connection for one user.
#[derive(Debug, Clone)]
pub struct PresenceEntry {
    /// Owning user.
    pub user_id: UserId,
    /// Display name.
    pub username: String,
    /// The connection all pushes for this user go to.
    pub handle: Arc<ConnectionHandle>,
    /// When this entry was registered.
    pub connected_at: DateTime<Utc>,
}

/// Read-only view of one registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceSummary {
    /// User ID.
    pub user_id: UserId,
    /// Username.
    pub username: String,
    /// Location tag of the live connection.
    pub location: Option<String>,
    /// When the live connection was registered.
    pub connected_at: DateTime<Utc>,
}

impl From<&PresenceEntry> for PresenceSummary {
    fn from(entry: &PresenceEntry) -> Self {
        Self {
            user_id: entry.user_id,
            username: entry.username.clone(),
            location: entry.handle.location.clone(),
            connected_at: entry.connected_at,
        }
    }
}

/// Maps each user to their single live connection.
///
/// Every operation is atomic with respect to the others: a concurrent
/// `is_online` never observes a half-applied `register`.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    entries: DashMap<UserId, PresenceEntry>,
}

impl PresenceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` as the live connection for `user_id`.
    ///
    /// Replaces any previous connection for the same user and returns it.
    /// The replaced transport is left open; it simply stops receiving pushes.
    pub fn register(
        &self,
        user_id: UserId,
        username: impl Into<String>,
        handle: Arc<ConnectionHandle>,
    ) -> Option<Arc<ConnectionHandle>> {
        let entry = PresenceEntry {
            user_id,
            username: username.into(),
            connected_at: handle.connected_at,
            handle,
        };
        let conn_id = entry.handle.id;

        let replaced = self.entries.insert(user_id, entry).map(|old| old.handle);
        match &replaced {
            Some(old) if old.id != conn_id => {
                info!(
                    user_id = %user_id,
                    old_conn_id = %old.id,
                    conn_id = %conn_id,
                    "Replaced live connection for user"
                );
            }
            _ => debug!(user_id = %user_id, conn_id = %conn_id, "User online"),
        }
        replaced.filter(|old| old.id != conn_id)
    }

    /// Forget the live connection for `user_id`. No-op when absent.
    pub fn unregister(&self, user_id: UserId) -> bool {
        let removed = self.entries.remove(&user_id).is_some();
        if removed {
            debug!(user_id = %user_id, "User offline");
        }
        removed
    }

    /// Forget `user_id` only if `conn_id` is still its live connection.
    ///
    /// Used on disconnect so a replaced connection closing late cannot
    /// evict its replacement.
    pub fn unregister_connection(&self, user_id: UserId, conn_id: ConnectionId) -> bool {
        let removed = self
            .entries
            .remove_if(&user_id, |_, entry| entry.handle.id == conn_id)
            .is_some();
        if removed {
            debug!(user_id = %user_id, conn_id = %conn_id, "User offline");
        }
        removed
    }

    /// Whether `user_id` currently has a live connection.
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.entries.contains_key(&user_id)
    }

    /// The subset of `user_ids` online at this instant.
    pub fn online_among(&self, user_ids: &[UserId]) -> HashSet<UserId> {
        user_ids
            .iter()
            .copied()
            .filter(|id| self.entries.contains_key(id))
            .collect()
    }

    /// The live connection for `user_id`, if any.
    pub fn connection_for(&self, user_id: UserId) -> Option<Arc<ConnectionHandle>> {
        self.entries.get(&user_id).map(|e| e.handle.clone())
    }

    /// Push a named event to `user_id`.
    ///
    /// Returns `true` only if a live connection existed and accepted the
    /// frame within its send timeout. Failures are logged and reported as
    /// `false`, which callers treat the same as offline.
    pub async fn send_to_user(
        &self,
        user_id: UserId,
        event: &str,
        payload: &serde_json::Value,
    ) -> bool {
        // Clone the handle out so no shard lock is held across the await.
        let Some(handle) = self.connection_for(user_id) else {
            return false;
        };

        let frame = match OutboundMessage::event(event, payload.clone()).to_text() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(
                    user_id = %user_id,
                    event_name = event,
                    error = %e,
                    "Failed to serialize live event"
                );
                return false;
            }
        };

        let sent = handle.send(frame).await;
        if !sent {
            warn!(
                user_id = %user_id,
                conn_id = %handle.id,
                event_name = event,
                "Live push failed, treating user as offline"
            );
        }
        sent
    }

    /// Number of users online.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Every registry entry, ordered by connection time.
    pub fn snapshot(&self) -> Vec<PresenceSummary> {
        self.connected_users(None)
    }

    /// Online users, optionally restricted to a location tag.
    pub fn connected_users(&self, location: Option<&str>) -> Vec<PresenceSummary> {
        let mut users: Vec<PresenceSummary> = self
            .entries
            .iter()
            .filter(|e| match location {
                Some(loc) => e.handle.location.as_deref() == Some(loc),
                None => true,
            })
            .map(|e| PresenceSummary::from(e.value()))
            .collect();
        users.sort_by_key(|u| u.connected_at);
        users
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let count = self.entries.len();
        self.entries.clear();
        info!(count, "Presence registry cleared");
    }
}
