//! Auth session
//!
//! Tracks the identity asserted by the external auth provider: bootstraps
//! the user's stored profile on first sign-in, mirrors the user's own
//! public and private store paths into the current identity, and clears
//! everything on sign-out. The provider popup flow itself happens in the
//! browser; this module only consumes its result.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::info;
use waymark_common::events::{AppEvent, EventBus};
use waymark_common::types::{CurrentUser, ProviderIdentity, PublicProfile};
use waymark_common::Result;

use crate::store::RealtimeStore;

/// Current identity and its profile subscriptions
pub struct AuthSession {
    store: Arc<dyn RealtimeStore>,
    events: EventBus,
    current: RwLock<CurrentUser>,
    watchers: Mutex<Vec<JoinHandle<()>>>,
}

impl AuthSession {
    pub fn new(store: Arc<dyn RealtimeStore>, events: EventBus) -> Arc<Self> {
        Arc::new(Self {
            store,
            events,
            current: RwLock::new(CurrentUser::default()),
            watchers: Mutex::new(Vec::new()),
        })
    }

    /// Current user; an empty identifier means nobody is signed in
    pub async fn current(&self) -> CurrentUser {
        self.current.read().await.clone()
    }

    /// Derived sign-in state
    pub async fn logged_in(&self) -> bool {
        self.current.read().await.logged_in()
    }

    /// Handle a sign-in event from the auth provider
    ///
    /// First sign-in writes the public profile and the private email
    /// sub-path; afterwards both paths are mirrored into the current
    /// identity until sign-out.
    pub async fn sign_in(self: &Arc<Self>, identity: ProviderIdentity) -> Result<()> {
        // A provider sign-in replaces any previous session
        self.detach_watchers().await;

        if self.store.read_user(&identity.id).await?.is_none() {
            info!(user_id = %identity.id, "Registering new user profile");
            self.store
                .write_user(
                    &identity.id,
                    &PublicProfile {
                        name: identity.name.clone(),
                        photo: identity.photo.clone(),
                    },
                )
                .await?;
            self.store.write_user_email(&identity.id, &identity.email).await?;
        }

        {
            let mut current = self.current.write().await;
            *current = CurrentUser::default();
            current.id = identity.id.clone();
        }

        // Mirror the user's own profile paths; name/photo/email always
        // come from the store, not from the provider assertion.
        let mut profile_rx = self.store.subscribe_user(&identity.id).await?;
        let mut email_rx = self.store.subscribe_user_email(&identity.id).await?;

        let session = Arc::clone(self);
        let profile_task = tokio::spawn(async move {
            loop {
                let profile = profile_rx.borrow_and_update().clone();
                if let Some(profile) = profile {
                    {
                        let mut current = session.current.write().await;
                        current.name = profile.name;
                        current.photo = profile.photo;
                    }
                    session.emit_auth_state().await;
                }
                if profile_rx.changed().await.is_err() {
                    break;
                }
            }
        });

        let session = Arc::clone(self);
        let email_task = tokio::spawn(async move {
            loop {
                let email = email_rx.borrow_and_update().clone();
                if let Some(email) = email {
                    {
                        let mut current = session.current.write().await;
                        current.email = email;
                    }
                    session.emit_auth_state().await;
                }
                if email_rx.changed().await.is_err() {
                    break;
                }
            }
        });

        self.watchers.lock().await.extend([profile_task, email_task]);
        Ok(())
    }

    /// Handle a sign-out event
    pub async fn sign_out(&self) {
        self.detach_watchers().await;
        {
            let mut current = self.current.write().await;
            *current = CurrentUser::default();
        }
        self.events.emit_lossy(AppEvent::AuthStateChanged {
            user: None,
            timestamp: Utc::now(),
        });
    }

    async fn detach_watchers(&self) {
        for task in self.watchers.lock().await.drain(..) {
            task.abort();
        }
    }

    async fn emit_auth_state(&self) {
        let user = self.current.read().await.clone();
        self.events.emit_lossy(AppEvent::AuthStateChanged {
            user: Some(user),
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Arc<SqliteStore>, Arc<AuthSession>) {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = waymark_common::db::init_database(&dir.path().join("waymark.db"))
            .await
            .expect("init should succeed");
        let store = Arc::new(SqliteStore::new(pool));
        let session = AuthSession::new(store.clone(), EventBus::new(16));
        (dir, store, session)
    }

    fn identity() -> ProviderIdentity {
        ProviderIdentity {
            id: "u1".to_string(),
            name: "Amy".to_string(),
            email: "amy@example.com".to_string(),
            photo: "https://example.com/amy.png".to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_sign_in_bootstraps_profile() {
        let (_dir, store, session) = setup().await;

        assert!(!session.logged_in().await);
        session.sign_in(identity()).await.expect("sign-in should succeed");

        // Public profile and private email were registered
        let profile = store.read_user("u1").await.unwrap().expect("profile exists");
        assert_eq!(profile.name, "Amy");
        assert_eq!(
            store.read_user_email("u1").await.unwrap(),
            Some("amy@example.com".to_string())
        );

        // Current identity mirrors the stored paths
        tokio::time::sleep(Duration::from_millis(50)).await;
        let current = session.current().await;
        assert!(current.logged_in());
        assert_eq!(current.name, "Amy");
        assert_eq!(current.email, "amy@example.com");
    }

    #[tokio::test]
    async fn test_existing_profile_is_not_overwritten() {
        let (_dir, store, session) = setup().await;

        // Profile edited before this session
        store
            .write_user("u1", &PublicProfile { name: "Amy Q.".to_string(), photo: String::new() })
            .await
            .unwrap();
        store.write_user_email("u1", "old@example.com").await.unwrap();

        session.sign_in(identity()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The stored profile wins over the provider assertion
        let current = session.current().await;
        assert_eq!(current.name, "Amy Q.");
        assert_eq!(current.email, "old@example.com");
    }

    #[tokio::test]
    async fn test_profile_updates_mirror_into_current_user() {
        let (_dir, store, session) = setup().await;

        session.sign_in(identity()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        store
            .write_user("u1", &PublicProfile { name: "Amy R.".to_string(), photo: String::new() })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(session.current().await.name, "Amy R.");
    }

    #[tokio::test]
    async fn test_sign_out_clears_and_stops_updates() {
        let (_dir, store, session) = setup().await;

        session.sign_in(identity()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.sign_out().await;

        assert!(!session.logged_in().await);
        assert_eq!(session.current().await, CurrentUser::default());

        // Later profile writes no longer reach the cleared identity
        store
            .write_user("u1", &PublicProfile { name: "Ghost".to_string(), photo: String::new() })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(session.current().await.name, "");
    }
}
