//! Reminder scan: warn recipients a fixed lead time before an alert fires.

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};

use verdant_core::result::AppResult;
use verdant_database::store::AlertRepository;
use verdant_entity::alert::Alert;
use verdant_entity::notification::NotificationCategory;
use verdant_realtime::notification::dispatcher::AlertDispatcher;

use super::ScanSummary;

/// Handles the reminder window of a tick.
#[derive(Debug)]
pub struct PreNotificationScan {
    repo: Arc<dyn AlertRepository>,
    dispatcher: Arc<AlertDispatcher>,
    lead: Duration,
}

impl PreNotificationScan {
    /// Create the scan with the configured lead time.
    pub fn new(
        repo: Arc<dyn AlertRepository>,
        dispatcher: Arc<AlertDispatcher>,
        lead: Duration,
    ) -> Self {
        Self {
            repo,
            dispatcher,
            lead,
        }
    }

    /// Issue reminders for alerts due at `now + lead`.
    pub async fn run(&self, now: NaiveDateTime) -> AppResult<ScanSummary> {
        let target = now + self.lead;
        let alerts = self.repo.find_due_for_pre_notification(target).await?;

        let mut summary = ScanSummary {
            matched: alerts.len(),
            ..Default::default()
        };

        for alert in &alerts {
            if self.process(alert, now).await {
                summary.processed += 1;
            } else {
                summary.skipped += 1;
            }
        }

        if summary.matched > 0 {
            tracing::info!(
                instant = %target,
                matched = summary.matched,
                processed = summary.processed,
                skipped = summary.skipped,
                "Reminder scan finished"
            );
        }
        Ok(summary)
    }

    async fn process(&self, alert: &Alert, now: NaiveDateTime) -> bool {
        if !alert.is_active() || alert.pre_notified {
            tracing::warn!(
                alert_id = %alert.id,
                status = %alert.status,
                pre_notified = alert.pre_notified,
                "Alert not eligible for a reminder, skipping"
            );
            return false;
        }

        // The due-time scan owns anything at or before now.
        if alert.scheduled_at() <= now {
            tracing::warn!(
                alert_id = %alert.id,
                scheduled_at = %alert.scheduled_at(),
                "Reminder window overlaps due time, skipping"
            );
            return false;
        }

        let recipients = match self.repo.get_garden_recipients(alert.garden_id).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    alert_id = %alert.id,
                    error = %e,
                    "Failed to resolve recipients, reminder deferred"
                );
                return false;
            }
        };

        self.dispatcher
            .dispatch(alert, &recipients, NotificationCategory::Reminder)
            .await;

        // Flag once issued, whatever the per-recipient outcome.
        if let Err(e) = self.repo.mark_pre_notified(alert.id).await {
            tracing::error!(
                alert_id = %alert.id,
                error = %e,
                "Failed to flag alert as pre-notified"
            );
            return false;
        }
        true
    }
}
