//! Health check handler.

use axum::Json;
use axum::extract::State;

use verdant_core::error::AppError;

use crate::dto::response::{ApiResponse, HealthResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/health
///
/// Answers 503 when the PostgreSQL store is unreachable or its alert
/// tables are gone.
pub async fn health(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<HealthResponse>>, ApiError> {
    let database = match &state.db_pool {
        Some(pool) => {
            if !pool.health_check().await? {
                return Err(AppError::service_unavailable("Alert schema is missing").into());
            }
            "connected"
        }
        None => "memory",
    };

    Ok(Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })))
}
