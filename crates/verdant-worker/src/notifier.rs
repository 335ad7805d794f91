//! Notifications for alert use cases that happen outside the tick loop.
//!
//! Alert creation and manual cancellation are driven by request handlers;
//! they still fan out through the same dispatcher as the scheduler.

use std::sync::Arc;

use verdant_core::result::AppResult;
use verdant_database::store::AlertRepository;
use verdant_entity::alert::Alert;
use verdant_entity::notification::NotificationCategory;
use verdant_realtime::notification::dispatcher::{AlertDispatcher, DispatchReport};

/// Announces alert creation and cancellation to the garden's recipients.
#[derive(Debug, Clone)]
pub struct AlertNotifier {
    repo: Arc<dyn AlertRepository>,
    dispatcher: Arc<AlertDispatcher>,
}

impl AlertNotifier {
    /// Create a notifier.
    pub fn new(repo: Arc<dyn AlertRepository>, dispatcher: Arc<AlertDispatcher>) -> Self {
        Self { repo, dispatcher }
    }

    /// Tell every recipient that `alert` was scheduled.
    pub async fn notify_created(&self, alert: &Alert) -> AppResult<DispatchReport> {
        self.notify(alert, NotificationCategory::Creation).await
    }

    /// Tell every recipient that `alert` was cancelled.
    pub async fn notify_cancelled(&self, alert: &Alert) -> AppResult<DispatchReport> {
        self.notify(alert, NotificationCategory::Cancelled).await
    }

    async fn notify(
        &self,
        alert: &Alert,
        category: NotificationCategory,
    ) -> AppResult<DispatchReport> {
        let recipients = self.repo.get_garden_recipients(alert.garden_id).await?;
        let report = self.dispatcher.dispatch(alert, &recipients, category).await;

        tracing::debug!(
            alert_id = %alert.id,
            category = %category,
            recipients = recipients.len(),
            pushed = report.pushed,
            "Alert notification dispatched"
        );
        Ok(report)
    }
}
