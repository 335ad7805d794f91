//! Persistence contracts used by the scheduler and the dispatcher.

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use verdant_core::result::AppResult;
use verdant_core::types::{AlertId, GardenId, UserId};
use verdant_entity::alert::Alert;
use verdant_entity::garden::Recipient;
use verdant_entity::notification::{Notification, NotificationCategory};

/// State queries and transitions over persisted alerts.
///
/// Instants are local, minute-resolution timestamps; an alert matches when
/// its scheduled date and time fall inside that minute.
#[async_trait]
pub trait AlertRepository: Send + Sync + Debug + 'static {
    /// Active alerts due at `instant` whose reminder has not been issued.
    async fn find_due_for_pre_notification(&self, instant: NaiveDateTime)
    -> AppResult<Vec<Alert>>;

    /// Active alerts due at `instant`.
    async fn find_due_now(&self, instant: NaiveDateTime) -> AppResult<Vec<Alert>>;

    /// Set the reminder flag. Idempotent.
    async fn mark_pre_notified(&self, alert_id: AlertId) -> AppResult<()>;

    /// Move an `active` alert to `completed`.
    ///
    /// Returns `false` when the alert was not active (or no longer exists),
    /// in which case nothing changed.
    async fn transition_to_completed(&self, alert_id: AlertId) -> AppResult<bool>;

    /// The garden owner plus every active collaborator.
    async fn get_garden_recipients(&self, garden_id: GardenId) -> AppResult<Vec<Recipient>>;
}

/// Append-only per-user notification records.
#[async_trait]
pub trait NotificationMailbox: Send + Sync + Debug + 'static {
    /// Store one notification for `user_id`.
    async fn append(
        &self,
        user_id: UserId,
        alert_id: Option<AlertId>,
        category: NotificationCategory,
        message: &str,
    ) -> AppResult<Notification>;
}
