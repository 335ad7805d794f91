//! Alert dispatcher: writes mailbox records and pushes to online users.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, warn};

use verdant_core::types::UserId;
use verdant_database::store::NotificationMailbox;
use verdant_entity::alert::Alert;
use verdant_entity::garden::Recipient;
use verdant_entity::notification::NotificationCategory;

use crate::message::types::AlertEventPayload;
use crate::metrics::RealtimeMetrics;
use crate::presence::registry::PresenceRegistry;

use super::formatter::AlertMessageFormatter;

/// Outcome of one dispatch batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Mailbox records written.
    pub mailbox_written: usize,
    /// Mailbox appends that failed.
    pub mailbox_failed: usize,
    /// Live pushes accepted by a connection.
    pub pushed: usize,
    /// Recipients that got no live push (offline or failed send).
    pub offline: usize,
}

/// Fans one alert event out to its recipients.
///
/// Every recipient gets a mailbox record; recipients with a live
/// connection also get a push. Failures are isolated per recipient and
/// never surface to the caller.
#[derive(Debug)]
pub struct AlertDispatcher {
    presence: Arc<PresenceRegistry>,
    mailbox: Arc<dyn NotificationMailbox>,
    formatter: AlertMessageFormatter,
    metrics: Arc<RealtimeMetrics>,
}

impl AlertDispatcher {
    /// Create a dispatcher over the live registry and a mailbox.
    pub fn new(
        presence: Arc<PresenceRegistry>,
        mailbox: Arc<dyn NotificationMailbox>,
        formatter: AlertMessageFormatter,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            presence,
            mailbox,
            formatter,
            metrics,
        }
    }

    /// Dispatch `category` for `alert` to every recipient.
    ///
    /// A `Completed` batch reads the online partition once here; callers
    /// that already decided who is reachable use [`Self::dispatch_completion`].
    pub async fn dispatch(
        &self,
        alert: &Alert,
        recipients: &[Recipient],
        category: NotificationCategory,
    ) -> DispatchReport {
        if category == NotificationCategory::Completed {
            let online = self.presence.online_among(&recipient_ids(recipients));
            return self.dispatch_completion(alert, recipients, &online).await;
        }

        self.metrics.dispatch_batch();
        let mut report = DispatchReport::default();
        for recipient in recipients {
            let message = self.formatter.compose(category, recipient.role, alert);
            // Presence is read at the moment of each send.
            let online = self.presence.is_online(recipient.user_id);
            self.deliver(alert, recipient, category, &message, online, &mut report)
                .await;
        }
        log_batch(alert, category, recipients.len(), &report);
        report
    }

    /// Completion batch over a frozen presence partition.
    ///
    /// `online` decides the wording and who is pushed to for the whole
    /// batch. A recipient in `online` whose connection dropped since the
    /// partition was taken counts as offline for the push only.
    pub async fn dispatch_completion(
        &self,
        alert: &Alert,
        recipients: &[Recipient],
        online: &HashSet<UserId>,
    ) -> DispatchReport {
        self.metrics.dispatch_batch();
        let online_names: Vec<&str> = recipients
            .iter()
            .filter(|r| online.contains(&r.user_id))
            .map(|r| r.username.as_str())
            .collect();

        let mut report = DispatchReport::default();
        for recipient in recipients {
            let is_online = online.contains(&recipient.user_id);
            let message = if online_names.is_empty() {
                self.formatter.lapsed(recipient.role, alert)
            } else if is_online {
                self.formatter.completed(recipient.role, alert)
            } else {
                self.formatter
                    .completed_while_away(recipient.role, alert, &online_names)
            };
            self.deliver(
                alert,
                recipient,
                NotificationCategory::Completed,
                &message,
                is_online,
                &mut report,
            )
            .await;
        }
        log_batch(alert, NotificationCategory::Completed, recipients.len(), &report);
        report
    }

    async fn deliver(
        &self,
        alert: &Alert,
        recipient: &Recipient,
        category: NotificationCategory,
        message: &str,
        online: bool,
        report: &mut DispatchReport,
    ) {
        match self
            .mailbox
            .append(recipient.user_id, Some(alert.id), category, message)
            .await
        {
            Ok(_) => {
                report.mailbox_written += 1;
                self.metrics.mailbox(true);
            }
            Err(e) => {
                error!(
                    alert_id = %alert.id,
                    user_id = %recipient.user_id,
                    category = %category,
                    error = %e,
                    "Failed to write mailbox notification"
                );
                report.mailbox_failed += 1;
                self.metrics.mailbox(false);
            }
        }

        if !online {
            report.offline += 1;
            return;
        }

        let payload = AlertEventPayload {
            category,
            alert_id: alert.id,
            garden_id: alert.garden_id,
            garden_name: alert.garden_name.clone(),
            message: message.to_string(),
            play_sound: category.plays_sound(),
            timestamp: Utc::now(),
        };
        let payload = match serde_json::to_value(&payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(alert_id = %alert.id, error = %e, "Failed to encode live payload");
                report.offline += 1;
                return;
            }
        };

        let delivered = self
            .presence
            .send_to_user(recipient.user_id, category.event_name(), &payload)
            .await;
        self.metrics.push(delivered);
        if delivered {
            report.pushed += 1;
        } else {
            report.offline += 1;
        }
    }
}

/// User ids of a recipient list, in order.
pub fn recipient_ids(recipients: &[Recipient]) -> Vec<UserId> {
    recipients.iter().map(|r| r.user_id).collect()
}

fn log_batch(
    alert: &Alert,
    category: NotificationCategory,
    recipients: usize,
    report: &DispatchReport,
) {
    debug!(
        alert_id = %alert.id,
        category = %category,
        recipients,
        mailbox_written = report.mailbox_written,
        mailbox_failed = report.mailbox_failed,
        pushed = report.pushed,
        offline = report.offline,
        "Dispatch batch finished"
    );
}
