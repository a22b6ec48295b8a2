//! Venue cache table access
//!
//! One row per external venue identifier holding the last successful
//! enrichment fetch. Read once when an enrichment cache is constructed,
//! written only on successful fetch.

use crate::types::LocationInfo;
use crate::Result;
use sqlx::{Pool, Sqlite};

/// Read the stored enrichment values for a venue, if any
///
/// Missing sub-fields normalize to empty strings rather than None.
pub async fn get(db: &Pool<Sqlite>, venue_id: &str) -> Result<Option<LocationInfo>> {
    let row: Option<(Option<String>, Option<String>)> =
        sqlx::query_as("SELECT photo, tip FROM venue_cache WHERE venue_id = ?")
            .bind(venue_id)
            .fetch_optional(db)
            .await?;

    Ok(row.map(|(photo, tip)| LocationInfo {
        photo: photo.unwrap_or_default(),
        tip: tip.unwrap_or_default(),
    }))
}

/// Store the enrichment values for a venue, replacing any previous row
pub async fn put(db: &Pool<Sqlite>, venue_id: &str, info: &LocationInfo) -> Result<()> {
    sqlx::query("INSERT OR REPLACE INTO venue_cache (venue_id, photo, tip) VALUES (?, ?, ?)")
        .bind(venue_id)
        .bind(&info.photo)
        .bind(&info.tip)
        .execute(db)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, SqlitePool) {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = init_database(&dir.path().join("waymark.db"))
            .await
            .expect("init should succeed");
        (dir, pool)
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let (_dir, pool) = setup().await;
        assert_eq!(get(&pool, "V-missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let (_dir, pool) = setup().await;

        let info = LocationInfo {
            photo: "a500x300b".to_string(),
            tip: "Great!".to_string(),
        };
        put(&pool, "V1", &info).await.expect("put should succeed");

        assert_eq!(get(&pool, "V1").await.unwrap(), Some(info));
    }

    #[tokio::test]
    async fn test_put_replaces_previous_row() {
        let (_dir, pool) = setup().await;

        let first = LocationInfo {
            photo: "old".to_string(),
            tip: String::new(),
        };
        let second = LocationInfo {
            photo: "new".to_string(),
            tip: "tip".to_string(),
        };
        put(&pool, "V1", &first).await.unwrap();
        put(&pool, "V1", &second).await.unwrap();

        assert_eq!(get(&pool, "V1").await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_null_fields_normalize_to_empty() {
        let (_dir, pool) = setup().await;

        sqlx::query("INSERT INTO venue_cache (venue_id, photo, tip) VALUES ('V2', NULL, NULL)")
            .execute(&pool)
            .await
            .unwrap();

        let info = get(&pool, "V2").await.unwrap().expect("row exists");
        assert_eq!(info.photo, "");
        assert_eq!(info.tip, "");
    }
}
