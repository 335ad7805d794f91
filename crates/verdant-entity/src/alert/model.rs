//! Alert entity model.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use verdant_core::types::{AlertId, GardenId, UserId};

use super::status::AlertStatus;

/// A scheduled watering alert for a garden.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Alert {
    /// Unique alert identifier.
    pub id: AlertId,
    /// Garden the alert belongs to.
    pub garden_id: GardenId,
    /// Garden display name (joined from the garden row).
    pub garden_name: String,
    /// Free-text description of the watering task.
    pub description: String,
    /// Local date the alert is due.
    pub scheduled_date: NaiveDate,
    /// Local time the alert is due, minute resolution.
    pub scheduled_time: NaiveTime,
    /// Lifecycle state.
    pub status: AlertStatus,
    /// Set once the reminder has been issued. Never reset.
    pub pre_notified: bool,
    /// User who created the alert.
    pub created_by: UserId,
    /// When the alert was created.
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// Build a fresh `active` alert that has not been pre-notified.
    pub fn new(
        garden_id: GardenId,
        garden_name: impl Into<String>,
        description: impl Into<String>,
        scheduled_date: NaiveDate,
        scheduled_time: NaiveTime,
        created_by: UserId,
    ) -> Self {
        Self {
            id: AlertId::new(),
            garden_id,
            garden_name: garden_name.into(),
            description: description.into(),
            scheduled_date,
            scheduled_time,
            status: AlertStatus::Active,
            pre_notified: false,
            created_by,
            created_at: Utc::now(),
        }
    }

    /// Scheduled local instant, truncated to the minute.
    pub fn scheduled_at(&self) -> NaiveDateTime {
        let time = self
            .scheduled_time
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(self.scheduled_time);
        self.scheduled_date.and_time(time)
    }

    /// Whether the alert is still waiting to fire.
    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }

    /// Whether the alert falls due at exactly `instant` (minute resolution).
    pub fn is_due_at(&self, instant: NaiveDateTime) -> bool {
        self.scheduled_at() == instant
    }
}
