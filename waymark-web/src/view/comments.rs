//! Comment subscription lifecycle
//!
//! Maintains a live view of a single location's comment list. Each
//! snapshot from the store wholly replaces the list (never merged), with
//! every author resolved through the identity cache. Dropping the
//! subscription aborts the listener task, so no snapshot can mutate a
//! location after teardown.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;
use waymark_common::events::EventBus;
use waymark_common::types::StoredComment;

use crate::store::RealtimeStore;
use crate::view::location::MapLocation;
use crate::view::users::{ProfileHandle, UserCache};

/// One comment bound to its (lazily resolved) author
#[derive(Clone)]
pub struct Comment {
    pub user_id: String,
    pub content: String,
    /// Creation time, Unix epoch milliseconds
    pub timestamp: i64,
    /// Shared author handle; updates in place once the identity resolves
    pub author: ProfileHandle,
}

/// Live listener on one location's comment stream
pub struct CommentSubscription {
    place_id: String,
    task: JoinHandle<()>,
}

impl CommentSubscription {
    /// Subscribe to a location's comment stream
    ///
    /// The current snapshot is applied immediately; later snapshots apply
    /// as they arrive until the subscription is dropped.
    pub async fn start(
        store: Arc<dyn RealtimeStore>,
        location: Arc<MapLocation>,
        users: Arc<UserCache>,
        events: EventBus,
    ) -> waymark_common::Result<Self> {
        let place_id = location.place_id.clone();
        let mut rx = store.subscribe_comments(&place_id).await?;

        let task = tokio::spawn(async move {
            loop {
                let snapshot = rx.borrow_and_update().clone();
                apply_snapshot(&location, &snapshot, &users, &store, &events).await;
                if rx.changed().await.is_err() {
                    debug!(place_id = %location.place_id, "comment stream closed");
                    break;
                }
            }
        });

        Ok(Self { place_id, task })
    }

    /// Place this subscription listens on
    pub fn place_id(&self) -> &str {
        &self.place_id
    }
}

impl Drop for CommentSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Rebuild the location's comment list from a full snapshot
async fn apply_snapshot(
    location: &Arc<MapLocation>,
    snapshot: &[StoredComment],
    users: &Arc<UserCache>,
    store: &Arc<dyn RealtimeStore>,
    events: &EventBus,
) {
    let mut comments = Vec::with_capacity(snapshot.len());
    for stored in snapshot {
        let author = users.resolve(&stored.user_id, store, events).await;
        comments.push(Comment {
            user_id: stored.user_id.clone(),
            content: stored.content.clone(),
            timestamp: stored.timestamp,
            author,
        });
    }
    location.set_comments(comments).await;
}
