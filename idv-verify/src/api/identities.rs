//! Identity listing, ranking and activation
//!
//! **Endpoints:**
//! - GET /identities - summaries of every loaded identity
//! - GET /identities/:index/ranking - ranked candidates, no side effects
//! - POST /identities/:index/activate - switch identity and start verification

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::error::ApiResult;
use crate::models::{IdentitySummary, SessionSnapshot};
use crate::services::RankedCandidate;
use crate::AppState;

/// GET /identities response
#[derive(Debug, Serialize)]
pub struct IdentityListResponse {
    pub identities: Vec<IdentitySummary>,
}

/// GET /identities/:index/ranking response
#[derive(Debug, Serialize)]
pub struct RankingResponse {
    pub identity_index: usize,
    pub candidates: Vec<RankedCandidate>,
}

/// GET /identities
pub async fn list_identities(State(state): State<AppState>) -> Json<IdentityListResponse> {
    Json(IdentityListResponse {
        identities: state.orchestrator.dataset().summaries(),
    })
}

/// GET /identities/:index/ranking
pub async fn get_ranking(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> ApiResult<Json<RankingResponse>> {
    let candidates = state.orchestrator.ranking(index)?;
    Ok(Json(RankingResponse {
        identity_index: index,
        candidates,
    }))
}

/// POST /identities/:index/activate
///
/// Returns 202 with the fresh session; verification continues in the
/// background and reports through `/events`.
pub async fn activate_identity(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> ApiResult<(StatusCode, Json<SessionSnapshot>)> {
    let handle = match state.orchestrator.activate_identity(index).await {
        Ok(handle) => handle,
        Err(e) => {
            state.record_error(e.to_string()).await;
            return Err(e.into());
        }
    };

    info!(
        identity_index = index,
        generation = handle.generation(),
        "Activation requested via API"
    );

    Ok((StatusCode::ACCEPTED, Json(handle.snapshot)))
}

/// Build identity routes
pub fn identity_routes() -> Router<AppState> {
    Router::new()
        .route("/identities", get(list_identities))
        .route("/identities/:index/ranking", get(get_ranking))
        .route("/identities/:index/activate", post(activate_identity))
}
