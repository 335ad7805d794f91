//! Notification category enumeration.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use verdant_core::error::AppError;

use crate::text_enum::impl_text_column;

/// Why a notification was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    /// A new alert was scheduled.
    Creation,
    /// The alert is due in a few minutes.
    Reminder,
    /// The alert's due instant has arrived.
    Overdue,
    /// The alert was carried out.
    Completed,
    /// The alert was withdrawn.
    Cancelled,
}

impl NotificationCategory {
    /// Return the category as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creation => "creation",
            Self::Reminder => "reminder",
            Self::Overdue => "overdue",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Event name used for the live push.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Creation => "alert_created",
            Self::Reminder => "alert_reminder",
            Self::Overdue => "irrigation_due",
            Self::Completed => "alert_completed",
            Self::Cancelled => "alert_cancelled",
        }
    }

    /// Whether clients should play a sound for this category.
    pub fn plays_sound(&self) -> bool {
        matches!(self, Self::Reminder | Self::Overdue | Self::Completed)
    }
}

impl FromStr for NotificationCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "creation" => Ok(Self::Creation),
            "reminder" => Ok(Self::Reminder),
            "overdue" => Ok(Self::Overdue),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(AppError::validation(format!(
                "Unknown notification category '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl_text_column!(NotificationCategory);
