//! Presence registry and connection lifecycle through the realtime engine.

use serde_json::json;

use verdant_auth::JwtEncoder;
use verdant_core::config::AuthConfig;
use verdant_core::types::UserId;

use crate::helpers::{TestEngine, drain_events};

#[tokio::test]
async fn test_second_connection_replaces_first() {
    let engine = TestEngine::new();
    let user = UserId::new();
    let (first, mut first_rx) = engine.connect(user, "ann");
    let (second, mut second_rx) = engine.connect(user, "ann");

    let presence = &engine.realtime.presence;
    assert!(presence.is_online(user));
    assert_eq!(presence.count(), 1);

    assert!(presence.send_to_user(user, "probe", &json!({"n": 1})).await);
    assert!(drain_events(&mut first_rx).is_empty());
    assert_eq!(drain_events(&mut second_rx).len(), 1);

    // The replaced transport closing late must not evict its replacement.
    engine.realtime.connections.on_disconnect(&first.id);
    assert!(presence.is_online(user));
    assert_eq!(presence.connection_for(user).unwrap().id, second.id);

    engine.realtime.connections.on_disconnect(&second.id);
    assert!(!presence.is_online(user));
    assert_eq!(engine.realtime.stats().metrics.connections_replaced, 1);
}

#[tokio::test]
async fn test_unregister_unknown_user_is_noop() {
    let engine = TestEngine::new();
    assert!(!engine.realtime.presence.unregister(UserId::new()));
    assert_eq!(engine.realtime.presence.count(), 0);
}

#[tokio::test]
async fn test_anonymous_connection_is_invisible() {
    let engine = TestEngine::new();
    let (handle, _rx) = engine.realtime.connections.on_connect(None, None);

    assert!(!handle.is_authenticated());
    assert_eq!(engine.realtime.presence.count(), 0);
    assert_eq!(engine.realtime.stats().live_connection_count, 1);

    engine.realtime.connections.on_disconnect(&handle.id);
    assert_eq!(engine.realtime.stats().live_connection_count, 0);
}

#[tokio::test]
async fn test_token_resolves_identity() {
    let engine = TestEngine::new();
    let user = UserId::new();
    let token = JwtEncoder::new(&AuthConfig::default())
        .issue(user, "ann", chrono::Duration::minutes(5))
        .unwrap();

    let authenticator = &engine.realtime.authenticator;
    let identity = authenticator.authenticate(Some(&token)).unwrap();
    assert_eq!(identity.user_id, user);
    assert_eq!(identity.username, "ann");

    assert!(authenticator.authenticate(Some("not-a-jwt")).is_none());
    assert!(authenticator.authenticate(None).is_none());
}

#[tokio::test]
async fn test_closed_transport_reads_as_offline() {
    let engine = TestEngine::new();
    let user = UserId::new();
    let (_handle, rx) = engine.connect(user, "ann");
    drop(rx);

    let sent = engine
        .realtime
        .presence
        .send_to_user(user, "probe", &json!({}))
        .await;
    assert!(!sent);
}

#[tokio::test]
async fn test_shutdown_closes_connections_and_clears_registry() {
    let engine = TestEngine::new();
    let (ann, _ann_rx) = engine.connect(UserId::new(), "ann");
    let (anon, _anon_rx) = engine.realtime.connections.on_connect(None, None);

    engine.realtime.shutdown();

    assert!(ann.is_closed());
    assert!(anon.is_closed());
    assert_eq!(engine.realtime.presence.count(), 0);
    assert_eq!(engine.realtime.stats().live_connection_count, 0);
}
