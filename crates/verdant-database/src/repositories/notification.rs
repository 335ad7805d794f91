//! Notification mailbox implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use verdant_core::error::{AppError, ErrorKind};
use verdant_core::result::AppResult;
use verdant_core::types::{AlertId, NotificationId, UserId};
use verdant_entity::notification::{Notification, NotificationCategory};

use crate::store::NotificationMailbox;

/// Mailbox backed by the `notifications` table.
#[derive(Debug, Clone)]
pub struct PgNotificationMailbox {
    pool: PgPool,
}

impl PgNotificationMailbox {
    /// Create a new mailbox.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationMailbox for PgNotificationMailbox {
    async fn append(
        &self,
        user_id: UserId,
        alert_id: Option<AlertId>,
        category: NotificationCategory,
        message: &str,
    ) -> AppResult<Notification> {
        sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (id, user_id, alert_id, category, message) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, user_id, alert_id, category, message, is_read, created_at",
        )
        .bind(NotificationId::new())
        .bind(user_id)
        .bind(alert_id)
        .bind(category)
        .bind(message)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to append notification", e))
    }
}
