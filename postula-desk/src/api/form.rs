//! Form session endpoints
//!
//! The front end drives one form: load a record into it, clear it, submit
//! it. Which of create/update a submit performs is decided server-side by
//! the session's edit cursor.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use postula_common::{Candidate, EditCursor, InvalidFields, RecordId, SubmitOutcome};
use serde::Serialize;

use super::error::{parse_record_id, ApiError};
use crate::AppState;

/// Record loaded into the form for editing
#[derive(Debug, Serialize)]
pub struct EditResponse {
    pub id: RecordId,
    #[serde(flatten)]
    pub candidate: Candidate,
}

/// Submit result
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitResponse {
    Created { id: RecordId },
    Updated { id: RecordId },
    /// Every field the form should flag
    Rejected { invalid_fields: InvalidFields },
}

/// GET /api/form
pub async fn get_form(State(state): State<AppState>) -> Json<EditCursor> {
    Json(state.session.lock().await.cursor())
}

/// POST /api/form/clear
///
/// Drops any pending edit; the next submit creates a record.
pub async fn clear_form(State(state): State<AppState>) -> Json<EditCursor> {
    let mut session = state.session.lock().await;
    session.begin_create();
    Json(session.cursor())
}

/// POST /api/form/edit/:id
pub async fn begin_edit(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<EditResponse>, ApiError> {
    let id = parse_record_id(&raw_id)?;
    let candidate = state.session.lock().await.begin_edit(id).await?;
    Ok(Json(EditResponse { id, candidate }))
}

/// POST /api/form/submit
///
/// 201 created, 200 updated, 422 rejected (with every invalid field).
/// A body that is not a candidate is a 400.
pub async fn submit_form(
    State(state): State<AppState>,
    payload: Result<Json<Candidate>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(candidate) = payload?;
    let outcome = state.session.lock().await.submit(&candidate).await?;

    let (status, body) = match outcome {
        SubmitOutcome::Created(id) => (StatusCode::CREATED, SubmitResponse::Created { id }),
        SubmitOutcome::Updated(id) => (StatusCode::OK, SubmitResponse::Updated { id }),
        SubmitOutcome::Rejected(invalid_fields) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            SubmitResponse::Rejected { invalid_fields },
        ),
    };

    Ok((status, Json(body)).into_response())
}
