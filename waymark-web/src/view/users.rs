//! Identity cache for comment authors
//!
//! Maps user identifier → shared public-profile handle, for the lifetime
//! of the session with no eviction. An unknown author gets a placeholder
//! handle immediately (so the comment can render) while a one-shot store
//! read resolves the real profile in the background and updates the
//! handle in place.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;
use waymark_common::events::{AppEvent, EventBus};
use waymark_common::types::PublicProfile;

use crate::store::RealtimeStore;

/// Shared, in-place-updatable handle to one public identity
pub type ProfileHandle = Arc<RwLock<PublicProfile>>;

/// Session-lifetime cache of resolved public identities
pub struct UserCache {
    inner: RwLock<HashMap<String, ProfileHandle>>,
}

impl UserCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Cached handle for a user, or a placeholder resolved in the
    /// background via a one-shot store read
    pub async fn resolve(
        &self,
        user_id: &str,
        store: &Arc<dyn RealtimeStore>,
        events: &EventBus,
    ) -> ProfileHandle {
        {
            let cache = self.inner.read().await;
            if let Some(handle) = cache.get(user_id) {
                return Arc::clone(handle);
            }
        }

        let handle: ProfileHandle = Arc::new(RwLock::new(PublicProfile::default()));
        {
            let mut cache = self.inner.write().await;
            // Another snapshot may have raced its placeholder in first.
            if let Some(existing) = cache.get(user_id) {
                return Arc::clone(existing);
            }
            cache.insert(user_id.to_string(), Arc::clone(&handle));
        }

        let store = Arc::clone(store);
        let events = events.clone();
        let user_id = user_id.to_string();
        let resolved = Arc::clone(&handle);
        tokio::spawn(async move {
            match store.read_user(&user_id).await {
                Ok(Some(profile)) => {
                    *resolved.write().await = profile;
                    events.emit_lossy(AppEvent::UserResolved {
                        user_id,
                        timestamp: chrono::Utc::now(),
                    });
                }
                // An unknown commenter stays a placeholder
                Ok(None) => {}
                Err(e) => warn!(user_id = %user_id, "identity lookup failed: {}", e),
            }
        });

        handle
    }

    /// Whether an identity is already cached
    pub async fn contains(&self, user_id: &str) -> bool {
        self.inner.read().await.contains_key(user_id)
    }
}

impl Default for UserCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Arc<dyn RealtimeStore>) {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = waymark_common::db::init_database(&dir.path().join("waymark.db"))
            .await
            .expect("init should succeed");
        (dir, Arc::new(SqliteStore::new(pool)))
    }

    #[tokio::test]
    async fn test_placeholder_resolves_in_place() {
        let (_dir, store) = setup().await;
        let events = EventBus::new(16);
        let cache = UserCache::new();

        store
            .write_user("u1", &PublicProfile { name: "Amy".to_string(), photo: String::new() })
            .await
            .unwrap();

        let handle = cache.resolve("u1", &store, &events).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The same handle observed the update
        assert_eq!(handle.read().await.name, "Amy");
        assert!(cache.contains("u1").await);
    }

    #[tokio::test]
    async fn test_repeat_resolution_reuses_cached_handle() {
        let (_dir, store) = setup().await;
        let events = EventBus::new(16);
        let cache = UserCache::new();

        let first = cache.resolve("u1", &store, &events).await;
        let second = cache.resolve("u1", &store, &events).await;
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_unknown_user_stays_placeholder() {
        let (_dir, store) = setup().await;
        let events = EventBus::new(16);
        let cache = UserCache::new();

        let handle = cache.resolve("ghost", &store, &events).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(*handle.read().await, PublicProfile::default());
    }
}
