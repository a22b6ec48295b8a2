//! SQLite-backed realtime store
//!
//! Comments and profiles persist in the service database; each subscribed
//! path gets a lazily created watch channel that re-broadcasts the full
//! snapshot after every write to that path.

use super::{CommentSnapshot, RealtimeStore};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tokio::sync::{watch, Mutex};
use waymark_common::types::{PublicProfile, StoredComment};
use waymark_common::Result;

/// Bundled realtime store implementation
pub struct SqliteStore {
    db: SqlitePool,
    comment_channels: Mutex<HashMap<String, watch::Sender<CommentSnapshot>>>,
    user_channels: Mutex<HashMap<String, watch::Sender<Option<PublicProfile>>>>,
    email_channels: Mutex<HashMap<String, watch::Sender<Option<String>>>>,
    connectivity_tx: watch::Sender<bool>,
}

impl SqliteStore {
    pub fn new(db: SqlitePool) -> Self {
        let (connectivity_tx, _) = watch::channel(true);
        Self {
            db,
            comment_channels: Mutex::new(HashMap::new()),
            user_channels: Mutex::new(HashMap::new()),
            email_channels: Mutex::new(HashMap::new()),
            connectivity_tx,
        }
    }

    /// Flip the ambient connectivity signal
    pub fn set_online(&self, online: bool) {
        self.connectivity_tx.send_replace(online);
    }

    /// Number of live subscribers on a place's comment path
    pub async fn comment_subscriber_count(&self, place_id: &str) -> usize {
        self.comment_channels
            .lock()
            .await
            .get(place_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    async fn comment_snapshot(&self, place_id: &str) -> Result<CommentSnapshot> {
        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            "SELECT user_id, content, timestamp FROM tips WHERE place_id = ? ORDER BY user_id",
        )
        .bind(place_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(user_id, content, timestamp)| StoredComment {
                user_id,
                content,
                timestamp,
            })
            .collect())
    }
}

#[async_trait]
impl RealtimeStore for SqliteStore {
    async fn write_comment(&self, place_id: &str, comment: StoredComment) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO tips (place_id, user_id, content, timestamp) VALUES (?, ?, ?, ?)",
        )
        .bind(place_id)
        .bind(&comment.user_id)
        .bind(&comment.content)
        .bind(comment.timestamp)
        .execute(&self.db)
        .await?;

        let channels = self.comment_channels.lock().await;
        if let Some(tx) = channels.get(place_id) {
            tx.send_replace(self.comment_snapshot(place_id).await?);
        }
        Ok(())
    }

    async fn subscribe_comments(&self, place_id: &str) -> Result<watch::Receiver<CommentSnapshot>> {
        let mut channels = self.comment_channels.lock().await;
        if let Some(tx) = channels.get(place_id) {
            return Ok(tx.subscribe());
        }

        let (tx, rx) = watch::channel(self.comment_snapshot(place_id).await?);
        channels.insert(place_id.to_string(), tx);
        Ok(rx)
    }

    async fn read_user(&self, user_id: &str) -> Result<Option<PublicProfile>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT name, photo FROM users WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;

        Ok(row.map(|(name, photo)| PublicProfile { name, photo }))
    }

    async fn subscribe_user(&self, user_id: &str) -> Result<watch::Receiver<Option<PublicProfile>>> {
        let mut channels = self.user_channels.lock().await;
        if let Some(tx) = channels.get(user_id) {
            return Ok(tx.subscribe());
        }

        let (tx, rx) = watch::channel(self.read_user(user_id).await?);
        channels.insert(user_id.to_string(), tx);
        Ok(rx)
    }

    async fn write_user(&self, user_id: &str, profile: &PublicProfile) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO users (user_id, name, photo) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(&profile.name)
            .bind(&profile.photo)
            .execute(&self.db)
            .await?;

        let channels = self.user_channels.lock().await;
        if let Some(tx) = channels.get(user_id) {
            tx.send_replace(Some(profile.clone()));
        }
        Ok(())
    }

    async fn read_user_email(&self, user_id: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT email FROM users_private WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;

        Ok(row.map(|(email,)| email))
    }

    async fn subscribe_user_email(&self, user_id: &str) -> Result<watch::Receiver<Option<String>>> {
        let mut channels = self.email_channels.lock().await;
        if let Some(tx) = channels.get(user_id) {
            return Ok(tx.subscribe());
        }

        let (tx, rx) = watch::channel(self.read_user_email(user_id).await?);
        channels.insert(user_id.to_string(), tx);
        Ok(rx)
    }

    async fn write_user_email(&self, user_id: &str, email: &str) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO users_private (user_id, email) VALUES (?, ?)")
            .bind(user_id)
            .bind(email)
            .execute(&self.db)
            .await?;

        let channels = self.email_channels.lock().await;
        if let Some(tx) = channels.get(user_id) {
            tx.send_replace(Some(email.to_string()));
        }
        Ok(())
    }

    fn connectivity(&self) -> watch::Receiver<bool> {
        self.connectivity_tx.subscribe()
    }
}
