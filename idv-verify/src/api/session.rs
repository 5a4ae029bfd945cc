//! Active session inspection

use axum::{extract::State, routing::get, Json, Router};

use crate::error::{ApiError, ApiResult};
use crate::models::SessionSnapshot;
use crate::AppState;

/// GET /session
///
/// Snapshot of the active session; 404 until an identity has been activated.
pub async fn get_session(State(state): State<AppState>) -> ApiResult<Json<SessionSnapshot>> {
    state
        .orchestrator
        .snapshot()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No identity is active".to_string()))
}

/// Build session routes
pub fn session_routes() -> Router<AppState> {
    Router::new().route("/session", get(get_session))
}
