//! Tick-level behaviour of the reminder and due-time scans.

use std::time::Duration as StdDuration;

use chrono::Duration;

use verdant_core::config::AppConfig;
use verdant_entity::alert::{Alert, AlertStatus};
use verdant_entity::notification::NotificationCategory;

use crate::helpers::{TestEngine, minute};

#[tokio::test]
async fn test_reminder_issued_once_per_alert() {
    let engine = TestEngine::new();
    let (garden, owner) = engine.garden("ann");
    let bob = engine.collaborator(garden, "bob");
    let alert = engine.alert_at(garden, owner, 7, 0);

    let first = engine.scheduler.run_tick_at(minute(6, 50)).await;
    assert_eq!(first.reminders.unwrap().processed, 1);
    assert!(engine.store.get_alert(alert).unwrap().pre_notified);

    // Same minute again: the flag keeps the alert out of the window.
    let second = engine.scheduler.run_tick_at(minute(6, 50)).await;
    assert_eq!(second.reminders.unwrap().matched, 0);

    for user in [owner, bob] {
        let reminders = engine.mailbox(user, NotificationCategory::Reminder).await;
        assert_eq!(reminders.len(), 1);
    }
}

#[tokio::test]
async fn test_due_alert_completes_exactly_once() {
    let engine = TestEngine::new();
    let (garden, owner) = engine.garden("ann");
    let alert = engine.alert_at(garden, owner, 7, 0);

    let first = engine.scheduler.run_tick_at(minute(7, 0)).await;
    assert_eq!(first.due.unwrap().processed, 1);
    assert_eq!(
        engine.store.get_alert(alert).unwrap().status,
        AlertStatus::Completed
    );

    let again = engine.scheduler.run_tick_at(minute(7, 0)).await;
    assert_eq!(again.due.unwrap().matched, 0);
    assert_eq!(
        engine.mailbox(owner, NotificationCategory::Overdue).await.len(),
        1
    );
}

#[tokio::test]
async fn test_nobody_online_means_no_completion_batch() {
    let engine = TestEngine::new();
    let (garden, owner) = engine.garden("ann");
    let bob = engine.collaborator(garden, "bob");
    engine.alert_at(garden, owner, 7, 0);

    let report = engine.scheduler.run_tick_at(minute(7, 0)).await;
    let due = report.due.unwrap();
    assert_eq!(due.processed, 1);
    assert_eq!(due.completions_announced, 0);

    for user in [owner, bob] {
        assert_eq!(engine.mailbox(user, NotificationCategory::Overdue).await.len(), 1);
        assert!(
            engine
                .mailbox(user, NotificationCategory::Completed)
                .await
                .is_empty()
        );
    }
}

#[tokio::test]
async fn test_failed_read_abandons_tick_and_next_tick_recovers() {
    let engine = TestEngine::new();
    let (garden, owner) = engine.garden("ann");
    let alert = engine.alert_at(garden, owner, 7, 0);

    engine.repo.fail_reads(true);
    let failed = engine.scheduler.run_tick_at(minute(7, 0)).await;
    assert!(failed.due.is_none());
    assert!(failed.reminders.is_none());
    assert_eq!(engine.store.get_alert(alert).unwrap().status, AlertStatus::Active);
    assert!(engine.store.notifications().await.is_empty());

    engine.repo.fail_reads(false);
    let recovered = engine.scheduler.run_tick_at(minute(7, 0)).await;
    assert_eq!(recovered.due.unwrap().processed, 1);
    assert_eq!(
        engine.store.get_alert(alert).unwrap().status,
        AlertStatus::Completed
    );
}

#[tokio::test]
async fn test_cancelled_alert_never_fires() {
    let engine = TestEngine::new();
    let (garden, owner) = engine.garden("ann");
    let id = engine.alert_at(garden, owner, 7, 0);
    let mut cancelled = engine.store.get_alert(id).unwrap();
    cancelled.status = AlertStatus::Cancelled;
    engine.store.insert_alert(cancelled);

    let reminder = engine.scheduler.run_tick_at(minute(6, 50)).await;
    assert_eq!(reminder.reminders.unwrap().matched, 0);
    let due = engine.scheduler.run_tick_at(minute(7, 0)).await;
    assert_eq!(due.due.unwrap().matched, 0);
    assert!(engine.store.notifications().await.is_empty());
}

#[tokio::test]
async fn test_tick_evaluates_configured_zone() {
    let mut config = AppConfig::default();
    config.scheduler.utc_offset_minutes = 120;
    let engine = TestEngine::with_config(config);
    let (garden, owner) = engine.garden("ann");
    let alert = engine.alert_at(garden, owner, 9, 0);

    // 06:50 UTC is 08:50 at +02:00, ten minutes before the alert.
    let report = engine.scheduler.run_tick().await;
    assert_eq!(report.instant, minute(8, 50));
    assert!(engine.store.get_alert(alert).unwrap().pre_notified);

    engine.clock.advance(Duration::minutes(10));
    let report = engine.scheduler.run_tick().await;
    assert_eq!(report.due.unwrap().processed, 1);
}

#[tokio::test]
async fn test_non_active_alert_from_due_query_is_skipped() {
    let engine = TestEngine::new();
    let (garden, owner) = engine.garden("ann");
    let bob = engine.collaborator(garden, "bob");
    let (_handle, _rx) = engine.connect(bob, "bob");

    let mut done = Alert::new(
        garden,
        "Lawn",
        "Sprinklers, 15 minutes",
        minute(7, 0).date(),
        minute(7, 0).time(),
        owner,
    );
    done.status = AlertStatus::Completed;
    engine.repo.serve_stale(done);

    let due = engine.scheduler.run_tick_at(minute(7, 0)).await.due.unwrap();
    assert_eq!(due.matched, 1);
    assert_eq!(due.skipped, 1);
    assert_eq!(due.completions_announced, 0);
    assert!(engine.store.notifications().await.is_empty());
}

#[tokio::test]
async fn test_transition_that_changes_nothing_sends_no_completion() {
    let engine = TestEngine::new();
    let (garden, owner) = engine.garden("ann");
    let bob = engine.collaborator(garden, "bob");
    let (_handle, _rx) = engine.connect(bob, "bob");
    let alert = engine.alert_at(garden, owner, 7, 0);

    engine.repo.lose_transitions(true);
    let due = engine.scheduler.run_tick_at(minute(7, 0)).await.due.unwrap();
    assert_eq!(due.skipped, 1);
    assert_eq!(due.completions_announced, 0);

    for user in [owner, bob] {
        assert!(
            engine
                .mailbox(user, NotificationCategory::Completed)
                .await
                .is_empty()
        );
    }
    assert_eq!(engine.store.get_alert(alert).unwrap().status, AlertStatus::Active);
}

#[tokio::test]
async fn test_stop_waits_for_in_flight_tick() {
    let engine = TestEngine::new();
    let (garden, owner) = engine.garden("ann");
    // The clock reads 06:50, so the first tick finds this alert due.
    let alert = engine.alert_at(garden, owner, 6, 50);

    engine.repo.hold_due_scan();
    engine.scheduler.start().await;
    engine.repo.wait_until_held().await;

    let stop = engine.scheduler.stop();
    tokio::pin!(stop);
    assert!(
        tokio::time::timeout(StdDuration::from_millis(50), &mut stop)
            .await
            .is_err(),
        "stop returned while a tick was in flight"
    );
    assert_eq!(engine.store.get_alert(alert).unwrap().status, AlertStatus::Active);

    engine.repo.release_due_scan();
    stop.await;

    assert!(!engine.scheduler.is_running());
    assert_eq!(
        engine.store.get_alert(alert).unwrap().status,
        AlertStatus::Completed
    );
    assert_eq!(engine.mailbox(owner, NotificationCategory::Overdue).await.len(), 1);
    assert_eq!(engine.repo.due_queries(), 1);
}

