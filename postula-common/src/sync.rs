//! Form session workflow
//!
//! [`RecordSync`] sits between the intake form, the validator, and a
//! [`CandidateStore`]. It owns the session's edit cursor, which decides
//! whether the next submit creates a record or overwrites one:
//!
//! ```text
//! Idle --begin_edit(id)--> Editing(id)
//! Editing(id) --submit ok--> Idle
//! Editing(id) --begin_create--> Idle
//! Editing(id) --submit fails--> Editing(id)
//! ```
//!
//! The cursor only moves after the store confirms success, so a failed
//! call can be retried without re-entering data.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::record::{Candidate, InvalidFields, RecordId, StoredRecord};
use crate::store::{CandidateStore, SnapshotListener, StoreError, Subscription};
use crate::validation::is_record_persistable;

/// What the next submit will do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "id")]
pub enum EditCursor {
    /// Next submit creates a new record
    #[default]
    #[serde(rename = "create")]
    Idle,
    /// Next submit overwrites this record
    #[serde(rename = "edit")]
    Editing(RecordId),
}

/// Result of a submit that reached a decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(RecordId),
    Updated(RecordId),
    /// Validation failed; the store was not called
    Rejected(InvalidFields),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The record being read or edited no longer exists
    #[error("Record not found: {0}")]
    NotFound(RecordId),

    /// The store could not complete the call; safe to retry
    #[error("Store failure: {0}")]
    StoreFailure(String),
}

impl From<StoreError> for SyncError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => SyncError::NotFound(id),
            StoreError::Failure(msg) => SyncError::StoreFailure(msg),
        }
    }
}

/// One form session over a candidate store
///
/// Calls that move the cursor take `&mut self`; callers sharing a session
/// across tasks must put it behind a lock.
pub struct RecordSync<S: CandidateStore + ?Sized> {
    store: Arc<S>,
    cursor: EditCursor,
}

impl<S: CandidateStore + ?Sized> RecordSync<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            cursor: EditCursor::Idle,
        }
    }

    pub fn cursor(&self) -> EditCursor {
        self.cursor
    }

    /// Make the next submit create a new record (also used to clear the form)
    pub fn begin_create(&mut self) {
        if let EditCursor::Editing(id) = self.cursor {
            info!("Abandoned edit of candidate {}", id);
        }
        self.cursor = EditCursor::Idle;
    }

    /// Load a record for editing and point the cursor at it
    ///
    /// Returns the stored fields so the caller can fill the form. On failure
    /// the cursor is left as it was.
    pub async fn begin_edit(&mut self, id: RecordId) -> Result<Candidate, SyncError> {
        let candidate = self.store.read_one(id).await.map_err(|e| {
            warn!("Cannot edit candidate {}: {}", id, e);
            SyncError::from(e)
        })?;

        self.cursor = EditCursor::Editing(id);
        info!("Editing candidate {}", id);
        Ok(candidate)
    }

    /// Validate and persist the form fields according to the cursor
    pub async fn submit(&mut self, candidate: &Candidate) -> Result<SubmitOutcome, SyncError> {
        if let Err(invalid) = is_record_persistable(candidate) {
            warn!("Rejected candidate submission, invalid fields: {}", invalid);
            return Ok(SubmitOutcome::Rejected(invalid));
        }

        match self.cursor {
            EditCursor::Idle => {
                let id = self.store.create(candidate).await.map_err(|e| {
                    warn!("Create failed: {}", e);
                    SyncError::from(e)
                })?;
                info!("Created candidate {}", id);
                Ok(SubmitOutcome::Created(id))
            }
            EditCursor::Editing(id) => {
                self.store.update(id, candidate).await.map_err(|e| {
                    warn!("Update of candidate {} failed: {}", id, e);
                    SyncError::from(e)
                })?;
                self.cursor = EditCursor::Idle;
                info!("Updated candidate {}", id);
                Ok(SubmitOutcome::Updated(id))
            }
        }
    }

    /// Delete a record
    ///
    /// Confirmation is the caller's job. The cursor is not touched, even
    /// when it points at the removed record.
    pub async fn remove(&self, id: RecordId) -> Result<(), SyncError> {
        self.store.delete(id).await.map_err(|e| {
            warn!("Delete of candidate {} failed: {}", id, e);
            SyncError::from(e)
        })?;
        info!("Removed candidate {}", id);
        Ok(())
    }

    /// Receive the full collection now and after every change
    pub async fn subscribe_all<F>(&self, on_change: F) -> Result<Subscription, SyncError>
    where
        F: Fn(&[StoredRecord]) + Send + Sync + 'static,
    {
        let listener: SnapshotListener = Arc::new(on_change);
        Ok(self.store.subscribe(listener).await?)
    }
}
