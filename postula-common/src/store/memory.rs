//! In-process candidate store

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{CandidateStore, Snapshot, StoreError, StoreResult};
use crate::events::{CandidateEvent, ChangeTrigger, EventBus};
use crate::record::{Candidate, RecordId, StoredRecord};

/// Candidate store held in memory, kept in insertion order
pub struct MemoryStore {
    state: RwLock<Snapshot>,
    events: EventBus,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_event_capacity(EventBus::default().capacity())
    }

    pub fn with_event_capacity(capacity: usize) -> Self {
        Self {
            state: RwLock::new(Snapshot::default()),
            events: EventBus::new(capacity),
        }
    }

    // Called with the write lock held so snapshots are published in commit order.
    fn publish(&self, state: &mut Snapshot, trigger: ChangeTrigger) {
        state.version += 1;
        self.events.emit_lossy(CandidateEvent::snapshot_changed(
            state.version,
            state.records.clone(),
            trigger,
        ));
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CandidateStore for MemoryStore {
    async fn create(&self, candidate: &Candidate) -> StoreResult<RecordId> {
        let mut state = self.state.write().await;
        let id = RecordId::generate();
        let now = chrono::Utc::now();
        state.records.push(StoredRecord {
            id,
            candidate: candidate.clone(),
            created_at: now,
            updated_at: now,
        });
        debug!("Created candidate {}", id);
        self.publish(&mut state, ChangeTrigger::Created(id));
        Ok(id)
    }

    async fn read_one(&self, id: RecordId) -> StoreResult<Candidate> {
        let state = self.state.read().await;
        state
            .records
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.candidate.clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn update(&self, id: RecordId, candidate: &Candidate) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        record.candidate = candidate.clone();
        record.updated_at = chrono::Utc::now();
        debug!("Updated candidate {}", id);
        self.publish(&mut state, ChangeTrigger::Updated(id));
        Ok(())
    }

    async fn delete(&self, id: RecordId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let before = state.records.len();
        state.records.retain(|r| r.id != id);
        if state.records.len() != before {
            debug!("Deleted candidate {}", id);
            self.publish(&mut state, ChangeTrigger::Deleted(id));
        }
        Ok(())
    }

    async fn snapshot(&self) -> StoreResult<Snapshot> {
        Ok(self.state.read().await.clone())
    }

    fn events(&self) -> &EventBus {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str) -> Candidate {
        Candidate {
            national_id: "12345678-5".to_string(),
            full_name: name.to_string(),
            email: "x@example.cl".to_string(),
            phone: "555".to_string(),
            position: "QA".to_string(),
        }
    }

    #[tokio::test]
    async fn test_snapshot_keeps_insertion_order() {
        let store = MemoryStore::new();
        let a = store.create(&candidate("A")).await.unwrap();
        let b = store.create(&candidate("B")).await.unwrap();
        let c = store.create(&candidate("C")).await.unwrap();

        store.update(a, &candidate("A2")).await.unwrap();

        let ids: Vec<RecordId> = store.list_all().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryStore::new();
        let missing = RecordId::generate();
        let err = store.update(missing, &candidate("A")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn test_delete_unknown_emits_nothing() {
        let store = MemoryStore::new();
        let mut rx = store.events().subscribe();
        store.delete(RecordId::generate()).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_update_bumps_updated_at_only() {
        let store = MemoryStore::new();
        let id = store.create(&candidate("A")).await.unwrap();
        let before = store.list_all().await.unwrap()[0].clone();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.update(id, &candidate("B")).await.unwrap();

        let after = store.list_all().await.unwrap()[0].clone();
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at > before.updated_at);
        assert_eq!(after.candidate.full_name, "B");
    }

    #[tokio::test]
    async fn test_version_counts_published_mutations() {
        let store = MemoryStore::new();
        assert_eq!(store.snapshot().await.unwrap().version, 0);

        let mut rx = store.events().subscribe();
        let id = store.create(&candidate("A")).await.unwrap();
        store.update(id, &candidate("B")).await.unwrap();
        store.delete(RecordId::generate()).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().version(), 1);
        assert_eq!(rx.recv().await.unwrap().version(), 2);
        assert!(rx.try_recv().is_err());
        assert_eq!(store.snapshot().await.unwrap().version, 2);
    }
}
