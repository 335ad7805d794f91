//! Shared test helpers for integration tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde_json::Value;
use tokio::sync::{Notify, mpsc};

use verdant_core::clock::FixedClock;
use verdant_core::config::AppConfig;
use verdant_core::error::AppError;
use verdant_core::result::AppResult;
use verdant_core::types::{AlertId, GardenId, UserId};
use verdant_database::MemoryStore;
use verdant_database::store::AlertRepository;
use verdant_entity::alert::Alert;
use verdant_entity::garden::Recipient;
use verdant_entity::notification::{Notification, NotificationCategory};
use verdant_realtime::connection::authenticator::AuthenticatedConnection;
use verdant_realtime::connection::handle::ConnectionHandle;
use verdant_realtime::server::RealtimeEngine;
use verdant_worker::scheduler::AlertScheduler;

/// Alert repository over the in-memory store with switchable faults.
#[derive(Debug)]
pub struct FlakyRepository {
    inner: Arc<MemoryStore>,
    fail_reads: AtomicBool,
    lose_transitions: AtomicBool,
    stale: Mutex<Vec<Alert>>,
    hold_due_scan: AtomicBool,
    due_scan_held: Notify,
    due_scan_released: Notify,
    due_queries: AtomicUsize,
}

impl FlakyRepository {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            lose_transitions: AtomicBool::new(false),
            stale: Mutex::new(Vec::new()),
            hold_due_scan: AtomicBool::new(false),
            due_scan_held: Notify::new(),
            due_scan_released: Notify::new(),
            due_queries: AtomicUsize::new(0),
        }
    }

    /// Fail both scan queries.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Report every completion transition as having changed no row.
    pub fn lose_transitions(&self, lose: bool) {
        self.lose_transitions.store(lose, Ordering::SeqCst);
    }

    /// Return `alert` from every due-now query, whatever its state.
    pub fn serve_stale(&self, alert: Alert) {
        self.stale.lock().unwrap().push(alert);
    }

    /// Park the next due-now query until [`Self::release_due_scan`].
    pub fn hold_due_scan(&self) {
        self.hold_due_scan.store(true, Ordering::SeqCst);
    }

    /// Wait until a due-now query is parked.
    pub async fn wait_until_held(&self) {
        self.due_scan_held.notified().await;
    }

    pub fn release_due_scan(&self) {
        self.hold_due_scan.store(false, Ordering::SeqCst);
        self.due_scan_released.notify_one();
    }

    /// Due-now queries issued so far.
    pub fn due_queries(&self) -> usize {
        self.due_queries.load(Ordering::SeqCst)
    }

    fn check(&self) -> AppResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::database("connection reset by peer"));
        }
        Ok(())
    }
}

#[async_trait]
impl AlertRepository for FlakyRepository {
    async fn find_due_for_pre_notification(
        &self,
        instant: NaiveDateTime,
    ) -> AppResult<Vec<Alert>> {
        self.check()?;
        self.inner.find_due_for_pre_notification(instant).await
    }

    async fn find_due_now(&self, instant: NaiveDateTime) -> AppResult<Vec<Alert>> {
        self.due_queries.fetch_add(1, Ordering::SeqCst);
        if self.hold_due_scan.load(Ordering::SeqCst) {
            self.due_scan_held.notify_one();
            self.due_scan_released.notified().await;
        }
        self.check()?;

        let mut alerts = self.inner.find_due_now(instant).await?;
        alerts.extend(self.stale.lock().unwrap().iter().cloned());
        Ok(alerts)
    }

    async fn mark_pre_notified(&self, alert_id: AlertId) -> AppResult<()> {
        self.inner.mark_pre_notified(alert_id).await
    }

    async fn transition_to_completed(&self, alert_id: AlertId) -> AppResult<bool> {
        if self.lose_transitions.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.transition_to_completed(alert_id).await
    }

    async fn get_garden_recipients(&self, garden_id: GardenId) -> AppResult<Vec<Recipient>> {
        self.inner.get_garden_recipients(garden_id).await
    }
}

/// A fully wired engine over the in-memory store.
pub struct TestEngine {
    pub store: Arc<MemoryStore>,
    pub repo: Arc<FlakyRepository>,
    pub realtime: Arc<RealtimeEngine>,
    pub scheduler: AlertScheduler,
    pub clock: Arc<FixedClock>,
}

impl TestEngine {
    /// Engine with default configuration and the clock at 2026-06-01 06:50 UTC.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let repo = Arc::new(FlakyRepository::new(store.clone()));
        let realtime = Arc::new(RealtimeEngine::new(
            config.realtime.clone(),
            &config.auth,
            config.scheduler.pre_notification_lead_minutes,
            store.clone(),
        ));
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 6, 1, 6, 50, 0).unwrap(),
        ));
        let scheduler = AlertScheduler::new(
            repo.clone(),
            realtime.dispatcher.clone(),
            realtime.presence.clone(),
            clock.clone(),
            &config.scheduler,
        );

        Self {
            store,
            repo,
            realtime,
            scheduler,
            clock,
        }
    }

    /// Garden "Lawn" owned by a new user; returns the garden and owner.
    pub fn garden(&self, owner_name: &str) -> (GardenId, UserId) {
        let owner = self.store.add_user(owner_name);
        (self.store.add_garden("Lawn", owner), owner)
    }

    pub fn collaborator(&self, garden: GardenId, name: &str) -> UserId {
        let user = self.store.add_user(name);
        self.store.add_collaborator(garden, user);
        user
    }

    /// Active alert on 2026-06-01 at `hh:mm`.
    pub fn alert_at(&self, garden: GardenId, created_by: UserId, h: u32, m: u32) -> AlertId {
        self.store.insert_alert(Alert::new(
            garden,
            "Lawn",
            "Sprinklers, 15 minutes",
            NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            NaiveTime::from_hms_opt(h, m, 0).unwrap(),
            created_by,
        ))
    }

    /// Open an authenticated live connection.
    pub fn connect(
        &self,
        user_id: UserId,
        username: &str,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        self.realtime.connections.on_connect(
            Some(AuthenticatedConnection {
                user_id,
                username: username.to_string(),
            }),
            None,
        )
    }

    pub async fn mailbox(&self, user: UserId, category: NotificationCategory) -> Vec<Notification> {
        self.store
            .notifications_for(user)
            .await
            .into_iter()
            .filter(|n| n.category == category)
            .collect()
    }
}

/// Local minute on 2026-06-01.
pub fn minute(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 6, 1)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

/// Every event frame queued on `rx` so far.
pub fn drain_events(rx: &mut mpsc::Receiver<String>) -> Vec<Value> {
    let mut events = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        let value: Value = serde_json::from_str(&frame).unwrap();
        if value["type"] == "event" {
            events.push(value);
        }
    }
    events
}
