//! End-to-end delivery: mailbox records, live pushes and completion wording.

use verdant_entity::alert::AlertStatus;
use verdant_entity::notification::NotificationCategory;
use verdant_worker::notifier::AlertNotifier;

use crate::helpers::{TestEngine, drain_events, minute};

#[tokio::test]
async fn test_owner_offline_collaborator_online_at_due_time() {
    let engine = TestEngine::new();
    let (garden, ann) = engine.garden("ann");
    let bob = engine.collaborator(garden, "bob");
    let alert = engine.alert_at(garden, ann, 7, 0);
    let (_bob_conn, mut bob_rx) = engine.connect(bob, "bob");

    let report = engine.scheduler.run_tick_at(minute(7, 0)).await;
    assert_eq!(report.due.unwrap().completions_announced, 1);
    assert_eq!(
        engine.store.get_alert(alert).unwrap().status,
        AlertStatus::Completed
    );

    // Overdue: one mailbox record each, live push to bob only.
    assert_eq!(engine.mailbox(ann, NotificationCategory::Overdue).await.len(), 1);
    assert_eq!(engine.mailbox(bob, NotificationCategory::Overdue).await.len(), 1);

    let events = drain_events(&mut bob_rx);
    let names: Vec<&str> = events.iter().map(|e| e["event"].as_str().unwrap()).collect();
    assert_eq!(names, ["irrigation_due", "alert_completed"]);
    assert_eq!(events[0]["data"]["play_sound"], true);
    assert_eq!(events[0]["data"]["garden_name"], "Lawn");

    // Completed: ann is told bob handled it, bob gets the generic text.
    let ann_done = engine.mailbox(ann, NotificationCategory::Completed).await;
    assert_eq!(ann_done.len(), 1);
    assert!(ann_done[0].message.contains("bob"));
    assert!(ann_done[0].message.contains("while you were away"));

    let bob_done = engine.mailbox(bob, NotificationCategory::Completed).await;
    assert_eq!(bob_done.len(), 1);
    assert_eq!(
        bob_done[0].message,
        "Irrigation of the garden 'Lawn' is complete: Sprinklers, 15 minutes."
    );
    assert_eq!(events[1]["data"]["message"], bob_done[0].message.as_str());
}

#[tokio::test]
async fn test_one_mailbox_record_per_recipient_per_category() {
    let engine = TestEngine::new();
    let (garden, ann) = engine.garden("ann");
    let bob = engine.collaborator(garden, "bob");
    let cid = engine.collaborator(garden, "cid");
    engine.alert_at(garden, ann, 7, 0);
    let (_conn, _rx) = engine.connect(cid, "cid");

    engine.scheduler.run_tick_at(minute(6, 50)).await;
    engine.scheduler.run_tick_at(minute(7, 0)).await;

    // reminder + overdue + completed for each of three recipients.
    assert_eq!(engine.store.notifications().await.len(), 9);
    for user in [ann, bob, cid] {
        assert_eq!(engine.store.notifications_for(user).await.len(), 3);
    }

    let stats = engine.realtime.stats();
    assert_eq!(stats.metrics.mailbox_written, 9);
    assert_eq!(stats.metrics.pushes_sent, 3);
}

#[tokio::test]
async fn test_reminder_push_carries_lead_time() {
    let engine = TestEngine::new();
    let (garden, ann) = engine.garden("ann");
    engine.alert_at(garden, ann, 7, 0);
    let (_conn, mut rx) = engine.connect(ann, "ann");

    engine.scheduler.run_tick_at(minute(6, 50)).await;

    let events = drain_events(&mut rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event"], "alert_reminder");
    assert_eq!(events[0]["data"]["category"], "reminder");
    assert_eq!(events[0]["data"]["play_sound"], true);
    assert_eq!(
        events[0]["data"]["message"],
        "Irrigation for your garden 'Lawn' starts in 10 minutes (07:00): Sprinklers, 15 minutes."
    );
}

#[tokio::test]
async fn test_creation_and_cancellation_are_passive() {
    let engine = TestEngine::new();
    let (garden, ann) = engine.garden("ann");
    let id = engine.alert_at(garden, ann, 7, 0);
    let alert = engine.store.get_alert(id).unwrap();
    let (_conn, mut rx) = engine.connect(ann, "ann");

    let notifier = AlertNotifier::new(engine.repo.clone(), engine.realtime.dispatcher.clone());
    notifier.notify_created(&alert).await.unwrap();
    notifier.notify_cancelled(&alert).await.unwrap();

    let events = drain_events(&mut rx);
    let names: Vec<&str> = events.iter().map(|e| e["event"].as_str().unwrap()).collect();
    assert_eq!(names, ["alert_created", "alert_cancelled"]);
    assert!(events.iter().all(|e| e["data"]["play_sound"] == false));
    assert_eq!(engine.store.notifications_for(ann).await.len(), 2);
}
