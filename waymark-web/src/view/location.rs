//! Location entity
//!
//! One point of interest: static place data, its venue enrichment cache,
//! marker attachment/animation bookkeeping and the observable comment
//! list. Marker changes are broadcast so the rendering layer can mirror
//! them.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use waymark_common::events::{AppEvent, EventBus, MarkerAnimation};
use waymark_common::types::{LatLng, LocationData};

use crate::venue::VenueInfoCache;
use crate::view::comments::Comment;

/// Time to bounce markers after a search match
pub const BOUNCE_TIME: Duration = Duration::from_millis(750);

/// Per-index delay used to stagger the initial marker drop-in
pub const DROP_DELAY: Duration = Duration::from_millis(50);

/// Marker attachment and animation bookkeeping for one location
#[derive(Debug, Clone, Serialize)]
pub struct MarkerView {
    /// Whether the location passes the current filter
    pub visible: bool,
    /// Whether the marker is attached to the map
    pub on_map: bool,
    /// Current animation cue, if any
    pub animation: Option<MarkerAnimation>,
}

/// One location on the map
pub struct MapLocation {
    pub place_id: String,
    pub title: String,
    pub position: LatLng,
    /// Venue enrichment cache owned by this location
    pub info: VenueInfoCache,
    marker: RwLock<MarkerView>,
    comments: RwLock<Vec<Comment>>,
    events: EventBus,
}

impl MapLocation {
    /// Construct from one feed entry; markers start detached with the
    /// drop-in cue pending.
    pub fn new(data: LocationData, info: VenueInfoCache, events: EventBus) -> Arc<Self> {
        Arc::new(Self {
            place_id: data.place_id,
            title: data.title,
            position: data.position,
            info,
            marker: RwLock::new(MarkerView {
                visible: false,
                on_map: false,
                animation: Some(MarkerAnimation::Drop),
            }),
            comments: RwLock::new(Vec::new()),
            events,
        })
    }

    /// Current marker bookkeeping
    pub async fn marker(&self) -> MarkerView {
        self.marker.read().await.clone()
    }

    /// Current comment list (replaced wholesale by each snapshot)
    pub async fn comments(&self) -> Vec<Comment> {
        self.comments.read().await.clone()
    }

    /// Show or hide the location on the map
    ///
    /// Becoming visible attaches the marker, after `delay` when given
    /// (used to stagger the initial drop-in). Re-attaching an attached
    /// marker is harmless. Becoming invisible detaches immediately.
    pub async fn set_visibility(self: &Arc<Self>, visible: bool, delay: Option<Duration>) {
        let delay = delay.filter(|d| !d.is_zero());
        {
            let mut marker = self.marker.write().await;
            marker.visible = visible;
            if visible {
                if delay.is_none() {
                    marker.on_map = true;
                }
            } else {
                marker.on_map = false;
            }
        }
        self.emit_visibility().await;

        if visible {
            if let Some(delay) = delay {
                let location = Arc::clone(self);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    location.attach().await;
                });
            }
        }
    }

    /// Set or clear the marker animation cue
    pub async fn set_animation(&self, animation: Option<MarkerAnimation>) {
        {
            let mut marker = self.marker.write().await;
            marker.animation = animation;
        }
        self.events.emit_lossy(AppEvent::MarkerAnimationChanged {
            place_id: self.place_id.clone(),
            animation,
            timestamp: Utc::now(),
        });
    }

    /// Bounce the marker for [`BOUNCE_TIME`], then revert to the static
    /// presentation
    pub async fn bounce_once(self: &Arc<Self>) {
        self.set_animation(Some(MarkerAnimation::Bounce)).await;

        let location = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(BOUNCE_TIME).await;
            location.set_animation(None).await;
        });
    }

    /// Replace the comment list with a new snapshot
    pub async fn set_comments(&self, comments: Vec<Comment>) {
        let count = comments.len();
        {
            let mut current = self.comments.write().await;
            *current = comments;
        }
        self.events.emit_lossy(AppEvent::CommentsChanged {
            place_id: self.place_id.clone(),
            count,
            timestamp: Utc::now(),
        });
    }

    async fn attach(&self) {
        {
            let mut marker = self.marker.write().await;
            // The filter may have hidden the location again while the
            // drop-in delay was pending.
            if !marker.visible {
                return;
            }
            marker.on_map = true;
        }
        self.emit_visibility().await;
    }

    async fn emit_visibility(&self) {
        let marker = self.marker.read().await.clone();
        self.events.emit_lossy(AppEvent::MarkerVisibility {
            place_id: self.place_id.clone(),
            visible: marker.visible,
            on_map: marker.on_map,
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::venue::{VenueApi, VenueError};
    use async_trait::async_trait;
    use waymark_common::types::LocationInfo;

    struct NullApi;

    #[async_trait]
    impl VenueApi for NullApi {
        async fn fetch_venue(&self, _venue_id: &str) -> Result<LocationInfo, VenueError> {
            Err(VenueError::Network("offline".to_string()))
        }
    }

    async fn test_location() -> (tempfile::TempDir, Arc<MapLocation>) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = waymark_common::db::init_database(&dir.path().join("waymark.db"))
            .await
            .expect("init should succeed");

        let data = LocationData {
            title: "Coffee House".to_string(),
            position: LatLng { lat: 37.8, lng: -122.3 },
            place_id: "P1".to_string(),
            venue_id: "V1".to_string(),
        };
        let info = VenueInfoCache::hydrate(db, Arc::new(NullApi), "V1".to_string()).await;
        (dir, MapLocation::new(data, info, EventBus::new(16)))
    }

    #[tokio::test]
    async fn test_markers_start_detached_with_drop_cue() {
        let (_dir, location) = test_location().await;
        let marker = location.marker().await;
        assert!(!marker.visible);
        assert!(!marker.on_map);
        assert_eq!(marker.animation, Some(MarkerAnimation::Drop));
    }

    #[tokio::test]
    async fn test_set_visibility_is_idempotent() {
        let (_dir, location) = test_location().await;

        location.set_visibility(true, None).await;
        location.set_visibility(true, None).await;

        // Exactly one marker attached, not two
        let marker = location.marker().await;
        assert!(marker.visible);
        assert!(marker.on_map);

        location.set_visibility(false, None).await;
        assert!(!location.marker().await.on_map);
    }

    #[tokio::test]
    async fn test_delayed_attach() {
        let (_dir, location) = test_location().await;

        location.set_visibility(true, Some(Duration::from_millis(30))).await;

        // Visible immediately, attached only after the delay
        let marker = location.marker().await;
        assert!(marker.visible);
        assert!(!marker.on_map);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(location.marker().await.on_map);
    }

    #[tokio::test]
    async fn test_hide_during_drop_delay_wins() {
        let (_dir, location) = test_location().await;

        location.set_visibility(true, Some(Duration::from_millis(30))).await;
        location.set_visibility(false, None).await;

        tokio::time::sleep(Duration::from_millis(80)).await;
        let marker = location.marker().await;
        assert!(!marker.visible);
        assert!(!marker.on_map);
    }

    #[tokio::test]
    async fn test_bounce_reverts_after_bounce_time() {
        let (_dir, location) = test_location().await;

        location.bounce_once().await;
        assert_eq!(location.marker().await.animation, Some(MarkerAnimation::Bounce));

        tokio::time::sleep(BOUNCE_TIME + Duration::from_millis(100)).await;
        assert_eq!(location.marker().await.animation, None);
    }
}
