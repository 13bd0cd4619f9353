//! API error responses

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use postula_common::{RecordId, SyncError};
use serde_json::json;

/// Failures surfaced to the front end as `{"error": message}`
#[derive(Debug)]
pub enum ApiError {
    InvalidId(String),
    /// Request body is not a JSON candidate
    InvalidBody(String),
    NotFound(RecordId),
    StoreFailure(String),
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::NotFound(id) => ApiError::NotFound(id),
            SyncError::StoreFailure(msg) => ApiError::StoreFailure(msg),
        }
    }
}

// 422 is reserved for validation rejections, which carry `outcome`.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidId(id) => {
                (StatusCode::BAD_REQUEST, format!("Invalid record id: {}", id))
            }
            ApiError::InvalidBody(reason) => {
                (StatusCode::BAD_REQUEST, format!("Invalid request body: {}", reason))
            }
            ApiError::NotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Candidate not found: {}", id))
            }
            // Upstream store trouble; the front end keeps its form and may retry
            ApiError::StoreFailure(msg) => {
                (StatusCode::BAD_GATEWAY, format!("Store failure: {}", msg))
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Parse a record id from a path segment
pub fn parse_record_id(raw: &str) -> Result<RecordId, ApiError> {
    raw.parse().map_err(|_| ApiError::InvalidId(raw.to_string()))
}
