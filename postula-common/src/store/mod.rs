//! Candidate collection store
//!
//! The form workflow depends on a document store only through
//! [`CandidateStore`]: create, read one, update, delete, and a push
//! subscription that delivers the whole collection on every change.
//!
//! Two implementations ship with the crate:
//! - [`MemoryStore`]: process-local, for tests and throwaway sessions
//! - [`SqliteStore`]: persistent, backed by a sqlx `SqlitePool`

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::events::EventBus;
use crate::record::{Candidate, RecordId, StoredRecord};

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Store failures
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record with this id
    #[error("Record not found: {0}")]
    NotFound(RecordId),

    /// Backend unavailable or operation rejected remotely
    #[error("Store failure: {0}")]
    Failure(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Failure(e.to_string())
    }
}

/// Collection as of one committed version
///
/// `version` counts the mutations the store has published; it matches the
/// `version` of the [`CandidateEvent`](crate::events::CandidateEvent) that
/// carried the same records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub version: u64,
    pub records: Vec<StoredRecord>,
}

/// Callback receiving a full collection snapshot
pub type SnapshotListener = Arc<dyn Fn(&[StoredRecord]) + Send + Sync>;

/// Remote collection primitives used by the form workflow
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Insert a new record; never deduplicates
    async fn create(&self, candidate: &Candidate) -> StoreResult<RecordId>;

    async fn read_one(&self, id: RecordId) -> StoreResult<Candidate>;

    /// Overwrite all fields of an existing record
    ///
    /// Fails with `NotFound` if the record does not exist.
    async fn update(&self, id: RecordId, candidate: &Candidate) -> StoreResult<()>;

    /// Remove a record; removing an unknown id succeeds and emits nothing
    async fn delete(&self, id: RecordId) -> StoreResult<()>;

    /// Current collection in creation order, with the version it reflects
    async fn snapshot(&self) -> StoreResult<Snapshot>;

    /// Current collection in creation order
    async fn list_all(&self) -> StoreResult<Vec<StoredRecord>> {
        Ok(self.snapshot().await?.records)
    }

    /// Bus on which every committed mutation is published
    fn events(&self) -> &EventBus;

    /// Register a listener for collection snapshots
    ///
    /// The listener is called once with the current collection before this
    /// returns, then again with the full collection after every change
    /// until the returned [`Subscription`] is dropped or unsubscribed.
    /// Must be called from within a tokio runtime.
    async fn subscribe(&self, listener: SnapshotListener) -> StoreResult<Subscription> {
        // Subscribe before reading so no change between the two is missed.
        // Events already reflected in the initial read are dropped below.
        let mut rx = self.events().subscribe();
        let initial = self.snapshot().await?;
        listener(&initial.records);

        let mut seen = initial.version;
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) if event.version() <= seen => {
                        debug!("Skipping stale snapshot v{} (at v{})", event.version(), seen);
                    }
                    Ok(event) => {
                        seen = event.version();
                        listener(event.records());
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Snapshot listener lagged, skipped {} snapshots", skipped);
                    }
                    Err(RecvError::Closed) => {
                        debug!("Event bus closed, ending snapshot subscription");
                        break;
                    }
                }
            }
        });

        Ok(Subscription { task: Some(task) })
    }
}

/// Handle for a snapshot subscription; dropping it unsubscribes
#[derive(Debug)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Stop delivering snapshots to the listener
    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
