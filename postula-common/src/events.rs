//! Event types for the candidate collection
//!
//! Stores publish one [`CandidateEvent`] per successful mutation. Each event
//! carries the complete collection as it stands after the change, so a
//! subscriber can always render from the latest event alone.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::record::{RecordId, StoredRecord};

/// Why the collection changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id")]
pub enum ChangeTrigger {
    Created(RecordId),
    Updated(RecordId),
    Deleted(RecordId),
}

impl ChangeTrigger {
    pub fn record_id(&self) -> RecordId {
        match *self {
            ChangeTrigger::Created(id) | ChangeTrigger::Updated(id) | ChangeTrigger::Deleted(id) => id,
        }
    }
}

/// Collection events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CandidateEvent {
    /// Collection changed
    ///
    /// Triggers:
    /// - Store subscriptions: push the snapshot to listeners
    /// - SSE: re-render the candidate table
    SnapshotChanged {
        /// Store version after the change; strictly increasing per store
        version: u64,
        /// Full collection after the change, in creation order
        records: Vec<StoredRecord>,
        /// Mutation that produced this snapshot
        trigger: ChangeTrigger,
        /// When the change was committed
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl CandidateEvent {
    pub fn snapshot_changed(
        version: u64,
        records: Vec<StoredRecord>,
        trigger: ChangeTrigger,
    ) -> Self {
        CandidateEvent::SnapshotChanged {
            version,
            records,
            trigger,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            CandidateEvent::SnapshotChanged { version, .. } => *version,
        }
    }

    /// Snapshot carried by the event
    pub fn records(&self) -> &[StoredRecord] {
        match self {
            CandidateEvent::SnapshotChanged { records, .. } => records,
        }
    }
}

/// Distribution bus for collection events
///
/// Wraps `tokio::broadcast`, so publishing never blocks on slow subscribers;
/// a subscriber that falls more than `capacity` events behind sees
/// `RecvError::Lagged` and resumes from the oldest retained event.
///
/// # Examples
///
/// ```
/// use postula_common::events::EventBus;
///
/// let bus = EventBus::new(64);
/// let _rx = bus.subscribe();
/// assert_eq!(bus.subscriber_count(), 1);
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CandidateEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<CandidateEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: CandidateEvent,
    ) -> Result<usize, broadcast::error::SendError<CandidateEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: CandidateEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
