//! Due-time scan: fire alerts whose instant has arrived and complete them.

use std::sync::Arc;

use chrono::NaiveDateTime;

use verdant_core::result::AppResult;
use verdant_database::store::AlertRepository;
use verdant_entity::alert::Alert;
use verdant_entity::notification::NotificationCategory;
use verdant_realtime::notification::dispatcher::{AlertDispatcher, recipient_ids};
use verdant_realtime::presence::registry::PresenceRegistry;

use super::ScanSummary;

/// Handles the due-time window of a tick.
#[derive(Debug)]
pub struct DueTimeScan {
    repo: Arc<dyn AlertRepository>,
    dispatcher: Arc<AlertDispatcher>,
    presence: Arc<PresenceRegistry>,
}

impl DueTimeScan {
    /// Create the scan.
    pub fn new(
        repo: Arc<dyn AlertRepository>,
        dispatcher: Arc<AlertDispatcher>,
        presence: Arc<PresenceRegistry>,
    ) -> Self {
        Self {
            repo,
            dispatcher,
            presence,
        }
    }

    /// Process every active alert due at `now`.
    ///
    /// A failed initial query is returned so the caller can abandon the
    /// scan with nothing changed. Failures on individual alerts are logged
    /// and that alert is skipped.
    pub async fn run(&self, now: NaiveDateTime) -> AppResult<ScanSummary> {
        let alerts = self.repo.find_due_now(now).await?;

        let mut summary = ScanSummary {
            matched: alerts.len(),
            ..Default::default()
        };

        for alert in &alerts {
            match self.process(alert).await {
                Some(announced) => {
                    summary.processed += 1;
                    if announced {
                        summary.completions_announced += 1;
                    }
                }
                None => summary.skipped += 1,
            }
        }

        if summary.matched > 0 {
            tracing::info!(
                instant = %now,
                matched = summary.matched,
                processed = summary.processed,
                skipped = summary.skipped,
                "Due-time scan finished"
            );
        }
        Ok(summary)
    }

    /// Returns `None` when the alert was skipped, otherwise whether a
    /// completion batch went out.
    async fn process(&self, alert: &Alert) -> Option<bool> {
        if !alert.is_active() {
            tracing::warn!(
                alert_id = %alert.id,
                status = %alert.status,
                "Non-active alert returned by due-time query, skipping"
            );
            return None;
        }

        let recipients = match self.repo.get_garden_recipients(alert.garden_id).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    alert_id = %alert.id,
                    garden_id = %alert.garden_id,
                    error = %e,
                    "Failed to resolve recipients, skipping alert"
                );
                return None;
            }
        };

        self.dispatcher
            .dispatch(alert, &recipients, NotificationCategory::Overdue)
            .await;

        match self.repo.transition_to_completed(alert.id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(
                    alert_id = %alert.id,
                    "Alert was no longer active at completion, skipping"
                );
                return None;
            }
            Err(e) => {
                tracing::error!(
                    alert_id = %alert.id,
                    error = %e,
                    "Failed to complete alert"
                );
                return None;
            }
        }

        let online = self.presence.online_among(&recipient_ids(&recipients));
        if online.is_empty() {
            tracing::debug!(
                alert_id = %alert.id,
                "Nobody online at completion, no completion announcement"
            );
            return Some(false);
        }

        self.dispatcher
            .dispatch_completion(alert, &recipients, &online)
            .await;
        Some(true)
    }
}
