//! Realtime store seam
//!
//! Path-addressed comment and user storage with full-snapshot
//! subscriptions and an ambient connectivity signal. The hosted backend's
//! wire protocol is out of scope; the service runs on the bundled SQLite
//! implementation, and tests drive the same trait.

pub mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use tokio::sync::watch;
use waymark_common::types::{PublicProfile, StoredComment};
use waymark_common::Result;

/// Full comment set for one place, in ascending user-identifier order
/// (the path-keyed store's key order).
pub type CommentSnapshot = Vec<StoredComment>;

/// Path-addressed realtime comment/user store
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Write (or replace) one user's comment for a place
    async fn write_comment(&self, place_id: &str, comment: StoredComment) -> Result<()>;

    /// Subscribe to the full comment set for a place
    ///
    /// The receiver holds the current snapshot immediately and observes
    /// every later change. Unsubscribing is dropping the receiver.
    async fn subscribe_comments(&self, place_id: &str) -> Result<watch::Receiver<CommentSnapshot>>;

    /// Read a user's public profile once; None when never written
    async fn read_user(&self, user_id: &str) -> Result<Option<PublicProfile>>;

    /// Subscribe to a user's public profile path
    async fn subscribe_user(&self, user_id: &str) -> Result<watch::Receiver<Option<PublicProfile>>>;

    /// Write a user's public profile
    async fn write_user(&self, user_id: &str, profile: &PublicProfile) -> Result<()>;

    /// Read a user's private email once; None when never written
    async fn read_user_email(&self, user_id: &str) -> Result<Option<String>>;

    /// Subscribe to a user's private email sub-path
    async fn subscribe_user_email(&self, user_id: &str) -> Result<watch::Receiver<Option<String>>>;

    /// Write a user's private email
    async fn write_user_email(&self, user_id: &str, email: &str) -> Result<()>;

    /// Ambient connected/disconnected signal
    fn connectivity(&self) -> watch::Receiver<bool>;
}
