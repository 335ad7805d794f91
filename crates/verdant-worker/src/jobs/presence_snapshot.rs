//! Presence snapshot job: dumps the live registry to a JSON file.
//!
//! The file is advisory, for operators and debugging. Nothing reads it
//! back; the registry is always rebuilt from live connections.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use verdant_core::result::AppResult;
use verdant_realtime::presence::registry::{PresenceRegistry, PresenceSummary};

/// File contents.
#[derive(Debug, Serialize)]
struct PresenceSnapshot {
    taken_at: DateTime<Utc>,
    online_count: usize,
    users: Vec<PresenceSummary>,
}

/// Writes the registry snapshot to `path`.
#[derive(Debug, Clone)]
pub struct PresenceSnapshotJob {
    presence: Arc<PresenceRegistry>,
    path: PathBuf,
}

impl PresenceSnapshotJob {
    /// Create the job.
    pub fn new(presence: Arc<PresenceRegistry>, path: impl Into<PathBuf>) -> Self {
        Self {
            presence,
            path: path.into(),
        }
    }

    /// Take and write one snapshot. Returns the number of users written.
    pub async fn run(&self) -> AppResult<usize> {
        let users = self.presence.snapshot();
        let snapshot = PresenceSnapshot {
            taken_at: Utc::now(),
            online_count: users.len(),
            users,
        };
        let bytes = serde_json::to_vec_pretty(&snapshot)?;

        // Write then rename so readers never see a partial file.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::trace!(
            path = %self.path.display(),
            online = snapshot.online_count,
            "Presence snapshot written"
        );
        Ok(snapshot.online_count)
    }
}
