//! HTTP API handlers for postula-desk

pub mod candidates;
pub mod error;
pub mod form;
pub mod health;

pub use candidates::{delete_candidate, event_stream};
pub use error::ApiError;
pub use form::{begin_edit, clear_form, get_form, submit_form};
pub use health::health_routes;
