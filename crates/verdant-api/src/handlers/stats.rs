//! Engine statistics handler.

use axum::Json;
use axum::extract::State;

use crate::dto::response::{ApiResponse, StatsResponse};
use crate::state::AppState;

/// GET /api/stats
pub async fn stats(State(state): State<AppState>) -> Json<ApiResponse<StatsResponse>> {
    let realtime = state.realtime.stats();
    Json(ApiResponse::ok(StatsResponse {
        online_count: realtime.online_count,
        scheduler_running: state.scheduler.is_running(),
        live_connection_count: realtime.live_connection_count,
        metrics: realtime.metrics,
    }))
}
