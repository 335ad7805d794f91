//! Route definitions for the Verdant HTTP API.
//!
//! The live transport is mounted at `/ws`; read-only operational routes
//! live under `/api`.

use axum::Router;
use axum::routing::get;

use crate::handlers;
use crate::state::AppState;

/// Build the router with every route and the shared state.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/presence", get(handlers::presence::connected_users))
        .route("/stats", get(handlers::stats::stats));

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(handlers::ws::ws_upgrade))
        .with_state(state)
}
