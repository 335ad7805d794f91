//! Wall-clock abstraction for the alert scheduler.
//!
//! Alerts are stored as a local date and a minute-resolution time, so the
//! scheduler only ever compares against "now" projected into the alert
//! zone and truncated to the minute.

use std::fmt::Debug;
use std::sync::Mutex;

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Timelike, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync + Debug {
    /// Current UTC instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually driven clock, used by tests and replay tooling.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Create a clock frozen at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    /// Advance the clock by `by`.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
            .lock()
            .map(|guard| *guard)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}

/// Project `now` into the zone at `offset` and drop seconds and below.
pub fn local_minute(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDateTime {
    let local = now.with_timezone(&offset).naive_local();
    truncate_to_minute(local)
}

/// Drop seconds and sub-second precision.
pub fn truncate_to_minute(instant: NaiveDateTime) -> NaiveDateTime {
    instant
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(instant)
}
