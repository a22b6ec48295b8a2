//! Integration tests for the application view
//!
//! Cover the selection/subscription lifecycle, filtering, comment flow
//! and static feed loading.

use async_trait::async_trait;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use waymark_common::events::EventBus;
use waymark_common::types::{LatLng, LocationData, LocationInfo, StoredComment, VenueState};
use waymark_web::store::{RealtimeStore, SqliteStore};
use waymark_web::venue::{VenueApi, VenueError};
use waymark_web::view::MainView;

struct NullApi;

#[async_trait]
impl VenueApi for NullApi {
    async fn fetch_venue(&self, _venue_id: &str) -> Result<LocationInfo, VenueError> {
        Ok(LocationInfo::default())
    }
}

fn entry(place_id: &str, title: &str, venue_id: &str) -> LocationData {
    LocationData {
        title: title.to_string(),
        position: LatLng { lat: 37.8, lng: -122.3 },
        place_id: place_id.to_string(),
        venue_id: venue_id.to_string(),
    }
}

fn comment(user_id: &str, content: &str) -> StoredComment {
    StoredComment {
        user_id: user_id.to_string(),
        content: content.to_string(),
        timestamp: 1,
    }
}

/// Test helper: view over a fresh database with two locations
async fn setup() -> (TempDir, Arc<SqliteStore>, Arc<MainView>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = waymark_common::db::init_database(&dir.path().join("waymark.db"))
        .await
        .expect("init should succeed");

    let store = Arc::new(SqliteStore::new(db.clone()));
    let store_dyn: Arc<dyn RealtimeStore> = store.clone();
    let view = MainView::new(
        db,
        Arc::new(NullApi),
        store_dyn,
        EventBus::new(64),
        "http://127.0.0.1:9/app.json".to_string(),
    );

    view.populate(vec![
        entry("P1", "Coffee House", "V1"),
        entry("P2", "Tea Room", "V2"),
    ])
    .await;

    (dir, store, view)
}

/// Give spawned subscription/teardown tasks a moment to settle
async fn settle() {
    tokio::time::sleep(Duration::from_millis(60)).await;
}

// =============================================================================
// Selection / subscription lifecycle
// =============================================================================

#[tokio::test]
async fn test_exactly_one_subscription_follows_selection() {
    let (_dir, store, view) = setup().await;

    view.select(Some("P1")).await.expect("select P1");
    settle().await;
    assert_eq!(view.subscribed_place_id().await.as_deref(), Some("P1"));
    assert_eq!(store.comment_subscriber_count("P1").await, 1);

    view.select(Some("P2")).await.expect("select P2");
    settle().await;
    assert_eq!(view.subscribed_place_id().await.as_deref(), Some("P2"));
    assert_eq!(store.comment_subscriber_count("P1").await, 0);
    assert_eq!(store.comment_subscriber_count("P2").await, 1);

    view.select(None).await.expect("deselect");
    settle().await;
    assert_eq!(view.subscribed_place_id().await, None);
    assert_eq!(store.comment_subscriber_count("P2").await, 0);
    assert!(view.selected().await.is_none());
}

#[tokio::test]
async fn test_reselecting_current_location_is_a_noop() {
    let (_dir, store, view) = setup().await;

    view.select(Some("P1")).await.unwrap();
    settle().await;

    view.select(Some("P1")).await.unwrap();
    settle().await;

    // Still exactly one subscription, not a second parallel one
    assert_eq!(store.comment_subscriber_count("P1").await, 1);
    assert_eq!(view.subscribed_place_id().await.as_deref(), Some("P1"));
}

#[tokio::test]
async fn test_selecting_unknown_place_fails() {
    let (_dir, _store, view) = setup().await;

    assert!(view.select(Some("P-unknown")).await.is_err());
    assert!(view.selected().await.is_none());
}

#[tokio::test]
async fn test_selection_recenters_viewport() {
    let (_dir, _store, view) = setup().await;

    let before = view.viewport().await;
    assert_eq!(before.zoom, waymark_web::view::DEFAULT_ZOOM);

    view.select(Some("P1")).await.unwrap();
    let after = view.viewport().await;
    assert_eq!(after.zoom, waymark_web::view::SELECTED_ZOOM);
    assert_eq!(after.center.lat, 37.8);
}

// =============================================================================
// Comment flow
// =============================================================================

#[tokio::test]
async fn test_comments_flow_into_selected_location() {
    let (_dir, store, view) = setup().await;

    view.select(Some("P1")).await.unwrap();
    settle().await;

    store.write_comment("P1", comment("amy", "lovely")).await.unwrap();
    settle().await;

    let location = view.find("P1").await.unwrap();
    let comments = location.comments().await;
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].content, "lovely");
}

#[tokio::test]
async fn test_snapshot_replaces_comment_list() {
    let (_dir, store, view) = setup().await;

    store.write_comment("P1", comment("amy", "first")).await.unwrap();
    store.write_comment("P1", comment("bob", "second")).await.unwrap();

    view.select(Some("P1")).await.unwrap();
    settle().await;

    let location = view.find("P1").await.unwrap();
    assert_eq!(location.comments().await.len(), 2);

    // A rewrite by one user replaces that user's comment, not appends
    store.write_comment("P1", comment("amy", "edited")).await.unwrap();
    settle().await;

    let comments = location.comments().await;
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].user_id, "amy");
    assert_eq!(comments[0].content, "edited");
}

#[tokio::test]
async fn test_no_updates_after_teardown() {
    let (_dir, store, view) = setup().await;

    view.select(Some("P1")).await.unwrap();
    settle().await;
    store.write_comment("P1", comment("amy", "while subscribed")).await.unwrap();
    settle().await;

    view.select(None).await.unwrap();
    settle().await;

    // Writes after unsubscribe must not mutate the location
    store.write_comment("P1", comment("bob", "after teardown")).await.unwrap();
    settle().await;

    let location = view.find("P1").await.unwrap();
    assert_eq!(location.comments().await.len(), 1);
}

#[tokio::test]
async fn test_comment_authors_resolve_through_identity_cache() {
    let (_dir, store, view) = setup().await;

    store
        .write_user(
            "amy",
            &waymark_common::types::PublicProfile {
                name: "Amy".to_string(),
                photo: String::new(),
            },
        )
        .await
        .unwrap();
    store.write_comment("P1", comment("amy", "hi")).await.unwrap();

    view.select(Some("P1")).await.unwrap();
    settle().await;

    let location = view.find("P1").await.unwrap();
    let comments = location.comments().await;
    assert_eq!(comments.len(), 1);
    // The shared handle resolved in place
    assert_eq!(comments[0].author.read().await.name, "Amy");
    assert!(view.users.contains("amy").await);
}

#[tokio::test]
async fn test_comment_write_requires_known_place() {
    let (_dir, _store, view) = setup().await;

    assert!(view.comment("P-unknown", "amy", "hi".to_string()).await.is_err());
    assert!(view.comment("P1", "amy", "hi".to_string()).await.is_ok());
}

// =============================================================================
// Filtering
// =============================================================================

#[tokio::test]
async fn test_filter_matches_case_insensitive_substring() {
    let (_dir, _store, view) = setup().await;
    settle().await;

    view.filter("coffee").await;

    let coffee = view.find("P1").await.unwrap();
    let tea = view.find("P2").await.unwrap();
    assert!(coffee.marker().await.visible);
    assert!(!tea.marker().await.visible);
    assert!(!tea.marker().await.on_map);

    view.reset().await;
    assert!(coffee.marker().await.visible);
    assert!(tea.marker().await.visible);
}

#[tokio::test]
async fn test_filter_with_no_matches_hides_everything() {
    let (_dir, _store, view) = setup().await;
    settle().await;

    view.filter("nowhere").await;

    for location in view.locations().await {
        assert!(!location.marker().await.visible);
    }
}

// =============================================================================
// Static feed loading
// =============================================================================

/// Serve a static feed document from an ephemeral local port
async fn serve_feed(json: &'static str) -> String {
    let app = Router::new().route("/app.json", get(move || async move { json }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/app.json", addr)
}

#[tokio::test]
async fn test_load_fetches_and_materializes_feed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = waymark_common::db::init_database(&dir.path().join("waymark.db"))
        .await
        .unwrap();
    let store: Arc<dyn RealtimeStore> = Arc::new(SqliteStore::new(db.clone()));

    let url = serve_feed(
        r#"{
            "locations": [
                {
                    "title": "Coffee House",
                    "position": {"lat": 37.8, "lng": -122.3},
                    "placeID": "P1",
                    "fourSquareID": "V1"
                }
            ]
        }"#,
    )
    .await;

    let view = MainView::new(db, Arc::new(NullApi), store, EventBus::new(64), url);
    assert!(!view.loaded());

    view.load().await.expect("feed load should succeed");
    assert!(view.loaded());

    let locations = view.locations().await;
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].place_id, "P1");
    assert_eq!(locations[0].info.state().await, VenueState::Fresh);

    // Staggered drop-in attaches the markers shortly after load
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(locations[0].marker().await.on_map);
}

#[tokio::test]
async fn test_load_failure_leaves_view_unloaded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = waymark_common::db::init_database(&dir.path().join("waymark.db"))
        .await
        .unwrap();
    let store: Arc<dyn RealtimeStore> = Arc::new(SqliteStore::new(db.clone()));

    // Nothing listens on this port
    let view = MainView::new(
        db,
        Arc::new(NullApi),
        store,
        EventBus::new(64),
        "http://127.0.0.1:1/app.json".to_string(),
    );

    assert!(view.load().await.is_err());
    assert!(!view.loaded());
    assert!(view.locations().await.is_empty());
}

#[tokio::test]
async fn test_reconnect_retries_unloaded_feed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = waymark_common::db::init_database(&dir.path().join("waymark.db"))
        .await
        .unwrap();
    let store = Arc::new(SqliteStore::new(db.clone()));
    let store_dyn: Arc<dyn RealtimeStore> = store.clone();

    let url = serve_feed(
        r#"{
            "locations": [
                {
                    "title": "Tea Room",
                    "position": {"lat": 37.9, "lng": -122.2},
                    "placeID": "P2",
                    "fourSquareID": "V2"
                }
            ]
        }"#,
    )
    .await;

    let view = MainView::new(db, Arc::new(NullApi), store_dyn, EventBus::new(64), url);
    view.spawn_connectivity_watcher();

    // The feed was never loaded; an offline → online transition retries it
    store.set_online(false);
    settle().await;
    assert!(!view.online().await);

    store.set_online(true);
    settle().await;
    assert!(view.online().await);
    assert!(view.loaded());
    assert_eq!(view.locations().await.len(), 1);
}
