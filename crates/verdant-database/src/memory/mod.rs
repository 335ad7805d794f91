//! In-memory alert repository and mailbox.
//!
//! Serves the `memory` database provider for local development and backs
//! the integration tests. Contents are lost on restart.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use dashmap::DashMap;
use tokio::sync::RwLock;
use tracing::debug;

use verdant_core::result::AppResult;
use verdant_core::types::{AlertId, GardenId, UserId};
use verdant_entity::alert::{Alert, AlertStatus};
use verdant_entity::garden::Recipient;
use verdant_entity::notification::{Notification, NotificationCategory};

use crate::store::{AlertRepository, NotificationMailbox};

/// A garden row.
#[derive(Debug, Clone)]
struct GardenRecord {
    name: String,
    owner_id: UserId,
    /// Active collaborators in insertion order.
    collaborators: Vec<UserId>,
}

/// Process-local store implementing both persistence contracts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<UserId, String>,
    gardens: DashMap<GardenId, GardenRecord>,
    alerts: DashMap<AlertId, Alert>,
    notifications: RwLock<Vec<Notification>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user and return its id.
    pub fn add_user(&self, username: impl Into<String>) -> UserId {
        let id = UserId::new();
        self.users.insert(id, username.into());
        id
    }

    /// Add a garden owned by `owner_id` and return its id.
    pub fn add_garden(&self, name: impl Into<String>, owner_id: UserId) -> GardenId {
        let id = GardenId::new();
        self.gardens.insert(
            id,
            GardenRecord {
                name: name.into(),
                owner_id,
                collaborators: Vec::new(),
            },
        );
        id
    }

    /// Add an active collaborator to a garden. Adding twice is a no-op.
    pub fn add_collaborator(&self, garden_id: GardenId, user_id: UserId) {
        if let Some(mut garden) = self.gardens.get_mut(&garden_id) {
            if garden.owner_id != user_id && !garden.collaborators.contains(&user_id) {
                garden.collaborators.push(user_id);
            }
        }
    }

    /// End a collaborator relationship.
    pub fn remove_collaborator(&self, garden_id: GardenId, user_id: UserId) {
        if let Some(mut garden) = self.gardens.get_mut(&garden_id) {
            garden.collaborators.retain(|c| *c != user_id);
        }
    }

    /// Store an alert as-is.
    pub fn insert_alert(&self, alert: Alert) -> AlertId {
        let id = alert.id;
        self.alerts.insert(id, alert);
        id
    }

    /// Current copy of an alert.
    pub fn get_alert(&self, alert_id: AlertId) -> Option<Alert> {
        self.alerts.get(&alert_id).map(|a| a.value().clone())
    }

    /// Every notification appended so far, oldest first.
    pub async fn notifications(&self) -> Vec<Notification> {
        self.notifications.read().await.clone()
    }

    /// Notifications for one user, oldest first.
    pub async fn notifications_for(&self, user_id: UserId) -> Vec<Notification> {
        self.notifications
            .read()
            .await
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }

    fn active_due_at(&self, instant: NaiveDateTime, pending_reminder_only: bool) -> Vec<Alert> {
        let mut due: Vec<Alert> = self
            .alerts
            .iter()
            .filter(|a| a.is_active() && a.is_due_at(instant))
            .filter(|a| !pending_reminder_only || !a.pre_notified)
            .map(|a| a.value().clone())
            .collect();
        due.sort_by_key(|a| a.created_at);
        due
    }
}

#[async_trait]
impl AlertRepository for MemoryStore {
    async fn find_due_for_pre_notification(
        &self,
        instant: NaiveDateTime,
    ) -> AppResult<Vec<Alert>> {
        Ok(self.active_due_at(instant, true))
    }

    async fn find_due_now(&self, instant: NaiveDateTime) -> AppResult<Vec<Alert>> {
        Ok(self.active_due_at(instant, false))
    }

    async fn mark_pre_notified(&self, alert_id: AlertId) -> AppResult<()> {
        if let Some(mut alert) = self.alerts.get_mut(&alert_id) {
            alert.pre_notified = true;
        }
        Ok(())
    }

    async fn transition_to_completed(&self, alert_id: AlertId) -> AppResult<bool> {
        let Some(mut alert) = self.alerts.get_mut(&alert_id) else {
            return Ok(false);
        };
        if !alert.status.can_transition_to(AlertStatus::Completed) {
            debug!(
                alert_id = %alert_id,
                status = %alert.status,
                "Alert not active, not completing"
            );
            return Ok(false);
        }
        alert.status = AlertStatus::Completed;
        Ok(true)
    }

    async fn get_garden_recipients(&self, garden_id: GardenId) -> AppResult<Vec<Recipient>> {
        let Some(garden) = self.gardens.get(&garden_id).map(|g| g.value().clone()) else {
            return Ok(Vec::new());
        };

        let username = |id: &UserId| {
            self.users
                .get(id)
                .map(|u| u.value().clone())
                .unwrap_or_else(|| id.to_string())
        };

        let mut recipients = vec![Recipient::owner(garden.owner_id, username(&garden.owner_id))];
        recipients.extend(
            garden
                .collaborators
                .iter()
                .map(|id| Recipient::collaborator(*id, username(id))),
        );
        Ok(recipients)
    }
}

#[async_trait]
impl NotificationMailbox for MemoryStore {
    async fn append(
        &self,
        user_id: UserId,
        alert_id: Option<AlertId>,
        category: NotificationCategory,
        message: &str,
    ) -> AppResult<Notification> {
        let notification = Notification::new(user_id, alert_id, category, message);
        self.notifications.write().await.push(notification.clone());
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::*;
    use verdant_entity::garden::RecipientRole;

    fn instant(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 6, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn seeded() -> (MemoryStore, GardenId, UserId) {
        let store = MemoryStore::new();
        let owner = store.add_user("alice");
        let garden = store.add_garden("Rose bed", owner);
        (store, garden, owner)
    }

    fn alert(store: &MemoryStore, garden: GardenId, owner: UserId, h: u32, m: u32) -> AlertId {
        store.insert_alert(Alert::new(
            garden,
            "Rose bed",
            "Deep soak",
            NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            NaiveTime::from_hms_opt(h, m, 0).unwrap(),
            owner,
        ))
    }

    #[tokio::test]
    async fn test_reminder_query_skips_flagged_alerts() {
        let (store, garden, owner) = seeded();
        let id = alert(&store, garden, owner, 7, 10);

        assert_eq!(store.find_due_for_pre_notification(instant(7, 10)).await.unwrap().len(), 1);
        store.mark_pre_notified(id).await.unwrap();
        assert!(store.find_due_for_pre_notification(instant(7, 10)).await.unwrap().is_empty());
        assert_eq!(store.find_due_now(instant(7, 10)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_completion_applies_once() {
        let (store, garden, owner) = seeded();
        let id = alert(&store, garden, owner, 7, 0);

        assert!(store.transition_to_completed(id).await.unwrap());
        assert!(!store.transition_to_completed(id).await.unwrap());
        assert!(store.find_due_now(instant(7, 0)).await.unwrap().is_empty());
        assert_eq!(store.get_alert(id).unwrap().status, AlertStatus::Completed);
    }

    #[tokio::test]
    async fn test_recipients_owner_first_then_collaborators() {
        let (store, garden, owner) = seeded();
        let bob = store.add_user("bob");
        store.add_collaborator(garden, bob);
        store.add_collaborator(garden, owner);

        let recipients = store.get_garden_recipients(garden).await.unwrap();
        assert_eq!(recipients.len(), 2);
        assert_eq!(recipients[0].role, RecipientRole::Owner);
        assert_eq!(recipients[0].username, "alice");
        assert_eq!(recipients[1].role, RecipientRole::Collaborator);
        assert_eq!(recipients[1].user_id, bob);

        store.remove_collaborator(garden, bob);
        assert_eq!(store.get_garden_recipients(garden).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mailbox_append() {
        let (store, _, owner) = seeded();
        store
            .append(owner, None, NotificationCategory::Reminder, "soon")
            .await
            .unwrap();
        let inbox = store.notifications_for(owner).await;
        assert_eq!(inbox.len(), 1);
        assert!(!inbox[0].is_read);
        assert_eq!(inbox[0].category, NotificationCategory::Reminder);
    }
}
