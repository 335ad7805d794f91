//! Inbound and outbound live-connection message type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use verdant_core::types::{AlertId, ConnectionId, GardenId};
use verdant_entity::notification::NotificationCategory;

/// Messages sent by the client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Pong response to server ping.
    Pong {
        /// Echoed timestamp.
        #[serde(default)]
        timestamp: Option<i64>,
    },
    /// Client-initiated keepalive.
    Ping {
        /// Client timestamp.
        #[serde(default)]
        timestamp: Option<i64>,
    },
}

/// Messages sent by the server to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Handshake acknowledgement.
    Connected {
        /// Server-assigned connection ID.
        connection_id: ConnectionId,
        /// Whether an identity was attached to the connection.
        authenticated: bool,
        /// Server timestamp.
        timestamp: DateTime<Utc>,
    },
    /// A named application event.
    Event {
        /// Event name, e.g. `irrigation_due`.
        event: String,
        /// Event payload.
        data: serde_json::Value,
        /// Server timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Ping (server keepalive).
    Ping {
        /// Server timestamp.
        timestamp: i64,
    },
    /// Reply to a client ping.
    Pong {
        /// Server timestamp.
        timestamp: i64,
    },
    /// Error message.
    Error {
        /// Error code.
        code: String,
        /// Error description.
        message: String,
    },
}

impl OutboundMessage {
    /// Wrap a named event.
    pub fn event(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self::Event {
            event: event.into(),
            data,
            timestamp: Utc::now(),
        }
    }

    /// Serialize to the text frame sent on the wire.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Payload pushed to a live connection for every alert notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEventPayload {
    /// Notification category.
    pub category: NotificationCategory,
    /// Originating alert.
    pub alert_id: AlertId,
    /// Garden the alert belongs to.
    pub garden_id: GardenId,
    /// Garden display name.
    pub garden_name: String,
    /// Text composed for this recipient.
    pub message: String,
    /// Whether the client should play an audible cue.
    pub play_sound: bool,
    /// Server timestamp.
    pub timestamp: DateTime<Utc>,
}
