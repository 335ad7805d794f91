//! Notification entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use verdant_core::types::{AlertId, NotificationId, UserId};

use super::category::NotificationCategory;

/// A durable mailbox record, read later by the user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// The recipient user.
    pub user_id: UserId,
    /// Alert that caused this notification, if any.
    pub alert_id: Option<AlertId>,
    /// Notification category.
    pub category: NotificationCategory,
    /// Notification body text.
    pub message: String,
    /// Whether the user has read this notification.
    pub is_read: bool,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Build an unread notification stamped with the current time.
    pub fn new(
        user_id: UserId,
        alert_id: Option<AlertId>,
        category: NotificationCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            user_id,
            alert_id,
            category,
            message: message.into(),
            is_read: false,
            created_at: Utc::now(),
        }
    }
}
