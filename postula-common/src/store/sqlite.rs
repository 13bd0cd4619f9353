//! SQLite-backed candidate store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{CandidateStore, Snapshot, StoreError, StoreResult};
use crate::events::{CandidateEvent, ChangeTrigger, EventBus};
use crate::record::{Candidate, RecordId, StoredRecord};
use crate::Result;

#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    guid: String,
    national_id: String,
    full_name: String,
    email: String,
    phone: String,
    position: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CandidateRow> for StoredRecord {
    type Error = StoreError;

    fn try_from(row: CandidateRow) -> StoreResult<Self> {
        let id: RecordId = row
            .guid
            .parse()
            .map_err(|e: crate::Error| StoreError::Failure(e.to_string()))?;
        Ok(StoredRecord {
            id,
            candidate: Candidate {
                national_id: row.national_id,
                full_name: row.full_name,
                email: row.email,
                phone: row.phone,
                position: row.position,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Candidate store persisted in a SQLite database
pub struct SqliteStore {
    pool: SqlitePool,
    events: EventBus,
    // Published version; held across mutate-then-snapshot so events leave
    // in commit order and reads see a version matching their rows.
    version: Mutex<u64>,
}

impl SqliteStore {
    /// Open (creating if needed) the database file at `db_path`
    pub async fn open(db_path: &Path, event_capacity: usize) -> Result<Self> {
        let newly_created = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(5000));
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        if newly_created {
            info!("Initialized new database: {}", db_path.display());
        } else {
            info!("Opened existing database: {}", db_path.display());
        }

        Self::from_pool(pool, event_capacity).await
    }

    /// Private in-memory database, discarded when the store is dropped
    pub async fn in_memory(event_capacity: usize) -> Result<Self> {
        // Every connection to sqlite::memory: is a separate database, so pin one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::from_pool(pool, event_capacity).await
    }

    /// Wrap an existing pool, creating the candidates table if needed
    pub async fn from_pool(pool: SqlitePool, event_capacity: usize) -> Result<Self> {
        create_candidates_table(&pool).await?;
        Ok(Self {
            pool,
            events: EventBus::new(event_capacity),
            version: Mutex::new(0),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn read_records(&self) -> StoreResult<Vec<StoredRecord>> {
        let rows = sqlx::query_as::<_, CandidateRow>("SELECT * FROM candidates ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(StoredRecord::try_from).collect()
    }

    // The mutation is already committed; a failed re-read only costs this snapshot.
    async fn publish(&self, version: &mut u64, trigger: ChangeTrigger) {
        *version += 1;
        match self.read_records().await {
            Ok(records) => self.events.emit_lossy(CandidateEvent::snapshot_changed(
                *version, records, trigger,
            )),
            Err(e) => warn!("Could not read snapshot after {:?}: {}", trigger, e),
        }
    }
}

async fn create_candidates_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS candidates (
            guid TEXT PRIMARY KEY,
            national_id TEXT NOT NULL,
            full_name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT NOT NULL,
            position TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[async_trait]
impl CandidateStore for SqliteStore {
    async fn create(&self, candidate: &Candidate) -> StoreResult<RecordId> {
        let mut version = self.version.lock().await;
        let id = RecordId::generate();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO candidates
                (guid, national_id, full_name, email, phone, position, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(candidate.national_id.as_str())
        .bind(candidate.full_name.as_str())
        .bind(candidate.email.as_str())
        .bind(candidate.phone.as_str())
        .bind(candidate.position.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!("Created candidate {}", id);
        self.publish(&mut version, ChangeTrigger::Created(id)).await;
        Ok(id)
    }

    async fn read_one(&self, id: RecordId) -> StoreResult<Candidate> {
        let row = sqlx::query_as::<_, CandidateRow>("SELECT * FROM candidates WHERE guid = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        Ok(StoredRecord::try_from(row)?.candidate)
    }

    async fn update(&self, id: RecordId, candidate: &Candidate) -> StoreResult<()> {
        let mut version = self.version.lock().await;

        let result = sqlx::query(
            r#"
            UPDATE candidates
            SET national_id = ?, full_name = ?, email = ?, phone = ?, position = ?, updated_at = ?
            WHERE guid = ?
            "#,
        )
        .bind(candidate.national_id.as_str())
        .bind(candidate.full_name.as_str())
        .bind(candidate.email.as_str())
        .bind(candidate.phone.as_str())
        .bind(candidate.position.as_str())
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        debug!("Updated candidate {}", id);
        self.publish(&mut version, ChangeTrigger::Updated(id)).await;
        Ok(())
    }

    async fn delete(&self, id: RecordId) -> StoreResult<()> {
        let mut version = self.version.lock().await;

        let result = sqlx::query("DELETE FROM candidates WHERE guid = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(());
        }

        debug!("Deleted candidate {}", id);
        self.publish(&mut version, ChangeTrigger::Deleted(id)).await;
        Ok(())
    }

    async fn snapshot(&self) -> StoreResult<Snapshot> {
        let version = self.version.lock().await;
        Ok(Snapshot {
            version: *version,
            records: self.read_records().await?,
        })
    }

    fn events(&self) -> &EventBus {
        &self.events
    }
}
