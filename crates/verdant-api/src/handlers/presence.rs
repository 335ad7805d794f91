//! Presence dashboard handler.

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use verdant_core::error::AppError;
use verdant_realtime::presence::registry::PresenceSummary;

use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for the presence listing.
#[derive(Debug, Deserialize)]
pub struct PresenceQuery {
    /// Only users connected from this location tag.
    pub location: Option<String>,
}

/// GET /api/presence?location={tag}
///
/// A blank `location` is rejected; omit the parameter to list everyone.
pub async fn connected_users(
    State(state): State<AppState>,
    Query(query): Query<PresenceQuery>,
) -> Result<Json<ApiResponse<Vec<PresenceSummary>>>, ApiError> {
    if query.location.as_deref().is_some_and(|l| l.trim().is_empty()) {
        return Err(AppError::validation("location filter must not be blank").into());
    }

    let users = state
        .realtime
        .presence
        .connected_users(query.location.as_deref());
    Ok(Json(ApiResponse::ok(users)))
}
