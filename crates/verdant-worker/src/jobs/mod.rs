//! Scan and maintenance job implementations.

pub mod due_time;
pub mod pre_notification;
pub mod presence_snapshot;

use serde::Serialize;

/// What one scan did during a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Alerts returned by the repository query.
    pub matched: usize,
    /// Alerts fully processed.
    pub processed: usize,
    /// Alerts skipped (inconsistent state or per-alert failure).
    pub skipped: usize,
    /// Completion batches issued (due-time scan only).
    pub completions_announced: usize,
}
