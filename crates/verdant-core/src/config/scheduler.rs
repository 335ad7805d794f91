//! Alert scheduler configuration.

use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Alert scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Whether the tick loop is started with the server.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between the start of consecutive ticks.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_seconds: u64,
    /// How many minutes before the due instant the reminder goes out.
    #[serde(default = "default_lead_minutes")]
    pub pre_notification_lead_minutes: u32,
    /// Offset from UTC, in minutes, of the zone alert dates and times are written in.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Where the advisory presence snapshot is written. Disabled when unset.
    #[serde(default)]
    pub presence_snapshot_path: Option<String>,
    /// Cron expression (with seconds) for the presence snapshot job.
    #[serde(default = "default_snapshot_cron")]
    pub presence_snapshot_cron: String,
}

impl SchedulerConfig {
    /// Tick period as a [`Duration`].
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_seconds)
    }

    /// Reminder lead time as a chrono duration.
    pub fn lead_time(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.pre_notification_lead_minutes))
    }

    /// Zone in which alert instants are expressed.
    ///
    /// Falls back to UTC for out-of-range offsets; [`AppConfig::validate`]
    /// rejects those before the scheduler ever starts.
    ///
    /// [`AppConfig::validate`]: super::AppConfig::validate
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval_seconds: default_tick_interval(),
            pre_notification_lead_minutes: default_lead_minutes(),
            utc_offset_minutes: 0,
            presence_snapshot_path: None,
            presence_snapshot_cron: default_snapshot_cron(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_tick_interval() -> u64 {
    60
}

fn default_lead_minutes() -> u32 {
    10
}

fn default_snapshot_cron() -> String {
    "*/30 * * * * *".to_string()
}
