//! Application builder: wires router, middleware and state into an Axum app.

use std::future::{Future, IntoFuture};
use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, Method};
use tokio::sync::Notify;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use verdant_core::config::ServerConfig;
use verdant_core::error::AppError;
use verdant_core::result::AppResult;

use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server);
    build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Builds a CORS tower layer from configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    if config.allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    layer.allow_origin(origins)
}

/// Bind and serve until `shutdown` resolves.
///
/// Once `shutdown` resolves, open connections get
/// `server.shutdown_grace_seconds` to finish before the server is dropped.
pub async fn serve<F>(state: AppState, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = state.config.server.bind_address();
    let grace = Duration::from_secs(state.config.server.shutdown_grace_seconds);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::configuration(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!(addr = %addr, "Verdant server listening");

    let draining = Arc::new(Notify::new());
    let signal = Arc::clone(&draining);
    let server = axum::serve(listener, build_app(state))
        .with_graceful_shutdown(async move {
            shutdown.await;
            signal.notify_one();
        })
        .into_future();

    bounded_drain(server, &draining, grace)
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))
}

/// Run `server` to completion, giving up `grace` after `draining` fires.
async fn bounded_drain<S>(server: S, draining: &Notify, grace: Duration) -> io::Result<()>
where
    S: Future<Output = io::Result<()>>,
{
    tokio::pin!(server);
    tokio::select! {
        result = &mut server => result,
        _ = draining.notified() => {
            match tokio::time::timeout(grace, &mut server).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        grace_seconds = grace.as_secs(),
                        "Connections still open after grace period, forcing shutdown"
                    );
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use verdant_core::clock::SystemClock;
    use verdant_core::config::AppConfig;
    use verdant_database::MemoryStore;
    use verdant_realtime::connection::authenticator::AuthenticatedConnection;
    use verdant_realtime::server::RealtimeEngine;
    use verdant_worker::scheduler::AlertScheduler;

    fn state() -> AppState {
        let config = AppConfig::default();
        let store = Arc::new(MemoryStore::new());
        let realtime = Arc::new(RealtimeEngine::new(
            config.realtime.clone(),
            &config.auth,
            config.scheduler.pre_notification_lead_minutes,
            store.clone(),
        ));
        let scheduler = Arc::new(AlertScheduler::new(
            store,
            realtime.dispatcher.clone(),
            realtime.presence.clone(),
            Arc::new(SystemClock),
            &config.scheduler,
        ));
        AppState::new(Arc::new(config), realtime, scheduler, None)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(build_app(state()), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");
        assert_eq!(body["data"]["database"], "memory");
    }

    #[tokio::test]
    async fn test_stats_reports_scheduler_and_presence() {
        let state = state();
        let identity = AuthenticatedConnection {
            user_id: verdant_core::types::UserId::new(),
            username: "ann".into(),
        };
        let (_handle, _rx) = state.realtime.connections.on_connect(Some(identity), None);

        let (status, body) = get_json(build_app(state), "/api/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["online_count"], 1);
        assert_eq!(body["data"]["live_connection_count"], 1);
        assert_eq!(body["data"]["scheduler_running"], false);
    }

    #[tokio::test]
    async fn test_presence_location_filter() {
        let state = state();
        for (name, location) in [("ann", "greenhouse"), ("bob", "field")] {
            let identity = AuthenticatedConnection {
                user_id: verdant_core::types::UserId::new(),
                username: name.into(),
            };
            // Receivers dropped: handles stay registered until disconnect.
            let _ = state
                .realtime
                .connections
                .on_connect(Some(identity), Some(location.into()));
        }

        let app = build_app(state);
        let (_, all) = get_json(app.clone(), "/api/presence").await;
        assert_eq!(all["data"].as_array().unwrap().len(), 2);

        let (_, filtered) = get_json(app, "/api/presence?location=field").await;
        let users = filtered["data"].as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["username"], "bob");
    }

    #[tokio::test]
    async fn test_presence_rejects_blank_location() {
        let (status, body) = get_json(build_app(state()), "/api/presence?location=%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_shutdown_stops_scheduler_before_closing_connections() {
        let state = state();
        let identity = AuthenticatedConnection {
            user_id: verdant_core::types::UserId::new(),
            username: "ann".into(),
        };
        let (handle, _rx) = state.realtime.connections.on_connect(Some(identity), None);
        state.scheduler.start().await;
        assert!(state.scheduler.is_running());

        state.shutdown().await;
        assert!(!state.scheduler.is_running());
        assert!(handle.is_closed());
        assert_eq!(state.realtime.presence.count(), 0);

        // Second signal is harmless.
        state.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_is_cut_off_after_grace() {
        let draining = Notify::new();
        draining.notify_one();

        let started = tokio::time::Instant::now();
        let result = bounded_drain(
            std::future::pending::<io::Result<()>>(),
            &draining,
            Duration::from_secs(5),
        )
        .await;
        assert!(result.is_ok());
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_drain_returns_server_result() {
        let draining = Notify::new();
        let result = bounded_drain(
            async { Err(io::Error::other("accept failed")) },
            &draining,
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(result.unwrap_err().to_string(), "accept failed");
    }
}
