//! Server-Sent Events (SSE) for verification progress

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::{AppState, MODULE_NAME};

/// GET /events - SSE stream of verification progress
///
/// Streams events:
/// - SessionActivated
/// - VerificationStarted
/// - VerificationCompleted
/// - SessionDrained
///
/// Stale completions are internal and not forwarded.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    idv_common::sse::create_event_sse_stream(MODULE_NAME, &state.event_bus, |event| {
        event.is_user_visible()
    })
}
