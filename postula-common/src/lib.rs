//! # Postula Common Library
//!
//! Shared code for the applicant intake services:
//! - Candidate record model
//! - Field validation (RUT checksum, email grammar)
//! - Candidate store trait with in-memory and SQLite backends
//! - Event types (CandidateEvent) and EventBus
//! - RecordSync, the form session workflow
//! - Configuration loading
//! - SSE helpers

pub mod config;
pub mod error;
pub mod events;
pub mod record;
pub mod sse;
pub mod store;
pub mod sync;
pub mod validation;

pub use error::{Error, Result};
pub use record::{Candidate, Field, InvalidFields, RecordId, StoredRecord};
pub use store::{
    CandidateStore, MemoryStore, Snapshot, SqliteStore, StoreError, StoreResult, Subscription,
};
pub use sync::{EditCursor, RecordSync, SubmitOutcome, SyncError};
