//! Server-Sent Events (SSE) utilities
//!
//! Bridges a snapshot subscription onto an SSE response. Each event is named
//! `CandidatesSnapshot` and carries the whole collection as a JSON array.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::record::StoredRecord;
use crate::store::{CandidateStore, Subscription};
use crate::sync::{RecordSync, SyncError};

/// SSE event name for collection snapshots
pub const SNAPSHOT_EVENT: &str = "CandidatesSnapshot";

/// Latest-snapshot feed owned by one consumer
///
/// Only the newest snapshot is kept: a slow reader skips intermediate
/// states rather than queueing them. Dropping the feed unsubscribes.
pub struct SnapshotFeed {
    subscription: Subscription,
    rx: watch::Receiver<Vec<StoredRecord>>,
}

impl SnapshotFeed {
    /// Wait for the next snapshot; `None` once the subscription has ended
    pub async fn next(&mut self) -> Option<Vec<StoredRecord>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }
}

/// Subscribe a [`SnapshotFeed`] to the session's store
///
/// The current collection is already waiting in the feed when this returns.
pub async fn subscribe_snapshots<S: CandidateStore + ?Sized>(
    sync: &RecordSync<S>,
) -> Result<SnapshotFeed, SyncError> {
    let (tx, rx) = watch::channel(Vec::<StoredRecord>::new());

    let subscription = sync
        .subscribe_all(move |records| {
            tx.send_replace(records.to_vec());
        })
        .await?;

    Ok(SnapshotFeed { subscription, rx })
}

/// Stream a feed to one SSE client until it disconnects
///
/// # Example
/// ```rust,ignore
/// pub async fn event_stream(State(state): State<AppState>) -> Result<Response, ApiError> {
///     let feed = subscribe_snapshots(&*state.session.lock().await).await?;
///     Ok(snapshot_sse_stream(feed, "postula-desk").into_response())
/// }
/// ```
pub fn snapshot_sse_stream(
    mut feed: SnapshotFeed,
    service_name: &'static str,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to {} candidate snapshots", service_name);

    let stream = async_stream::stream! {
        while let Some(records) = feed.next().await {
            debug!("SSE: Sending snapshot of {} candidates", records.len());
            match Event::default().event(SNAPSHOT_EVENT).json_data(&records) {
                Ok(event) => yield Ok(event),
                Err(e) => warn!("SSE: Failed to encode snapshot: {}", e),
            }
        }

        debug!("SSE: {} snapshot stream ended", service_name);
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
