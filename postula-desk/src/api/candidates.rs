//! Candidate collection endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use postula_common::sse::{snapshot_sse_stream, subscribe_snapshots};

use super::error::{parse_record_id, ApiError};
use crate::{AppState, MODULE_NAME};

/// DELETE /api/candidates/:id
///
/// Confirmation happens in the front end before this is called.
pub async fn delete_candidate(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_record_id(&raw_id)?;
    state.session.lock().await.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/events - SSE stream of candidate snapshots
///
/// The first event carries the current collection; each later event
/// carries the full collection after a change. This is the only way the
/// front end learns what records exist.
pub async fn event_stream(State(state): State<AppState>) -> Result<Response, ApiError> {
    let feed = subscribe_snapshots(&*state.session.lock().await).await?;
    Ok(snapshot_sse_stream(feed, MODULE_NAME).into_response())
}
