//! Response DTOs.

use serde::{Deserialize, Serialize};

use verdant_realtime::metrics::MetricsSnapshot;

/// Standard success wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Server version.
    pub version: String,
    /// `connected` or `memory`.
    pub database: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}

/// Engine statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Users with a registered live connection.
    pub online_count: usize,
    /// Whether the alert tick loop is active.
    pub scheduler_running: bool,
    /// Open connections, including anonymous ones.
    pub live_connection_count: usize,
    /// Counters since start.
    pub metrics: MetricsSnapshot,
}
