//! postula-desk library - applicant intake form service
//!
//! Exposes one form session (RecordSync) over HTTP for a browser front end.
//! The session is single-user: every call is serialized through one lock,
//! so there is exactly one edit cursor.

use axum::Router;
use postula_common::{CandidateStore, RecordSync};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

pub mod api;

/// Name reported by /health and in SSE logs
pub const MODULE_NAME: &str = "postula-desk";

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The form session; locked for the full duration of each call
    pub session: Arc<Mutex<RecordSync<dyn CandidateStore>>>,
}

impl AppState {
    pub fn new(store: Arc<dyn CandidateStore>) -> Self {
        Self {
            session: Arc::new(Mutex::new(RecordSync::new(store))),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{delete, get, post};

    let form = Router::new()
        .route("/api/form", get(api::get_form))
        .route("/api/form/clear", post(api::clear_form))
        .route("/api/form/edit/:id", post(api::begin_edit))
        .route("/api/form/submit", post(api::submit_form));

    let candidates = Router::new()
        .route("/api/candidates/:id", delete(api::delete_candidate))
        .route("/api/events", get(api::event_stream));

    Router::new()
        .merge(form)
        .merge(candidates)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
