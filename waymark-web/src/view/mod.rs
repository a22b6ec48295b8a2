//! Application view
//!
//! Owns the ordered location list, the single selection (and its comment
//! subscription), the map viewport, the online flag and search filtering.
//! This is the explicit-state replacement for the reference app's ambient
//! module globals.

pub mod comments;
pub mod location;
pub mod users;

pub use comments::{Comment, CommentSubscription};
pub use location::{MapLocation, MarkerView, BOUNCE_TIME, DROP_DELAY};
pub use users::UserCache;

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use waymark_common::events::{AppEvent, EventBus, MarkerAnimation};
use waymark_common::types::{LatLng, LocationData, LocationFeed, StoredComment, VenueState};
use waymark_common::{Error, Result};

use crate::store::RealtimeStore;
use crate::venue::{VenueApi, VenueInfoCache};

/// Initial map center
pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: 37.803674,
    lng: -122.329186,
};

/// Initial map zoom
pub const DEFAULT_ZOOM: u8 = 10;

/// Zoom applied when a location is selected
pub const SELECTED_ZOOM: u8 = 12;

/// Map viewport bookkeeping (re-centered on selection)
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: u8,
}

/// The single selected location and its live comment subscription
#[derive(Default)]
struct SelectionContext {
    current: Option<Arc<MapLocation>>,
    subscription: Option<CommentSubscription>,
}

/// Application view: location list, selection, filtering, connectivity
pub struct MainView {
    db: SqlitePool,
    api: Arc<dyn VenueApi>,
    store: Arc<dyn RealtimeStore>,
    events: EventBus,
    http: reqwest::Client,
    locations_url: String,

    locations: RwLock<Vec<Arc<MapLocation>>>,
    selection: Mutex<SelectionContext>,
    viewport: RwLock<Viewport>,
    online: RwLock<bool>,
    loaded: AtomicBool,
    /// Identity cache shared with the comment subscription
    pub users: Arc<UserCache>,
}

impl MainView {
    pub fn new(
        db: SqlitePool,
        api: Arc<dyn VenueApi>,
        store: Arc<dyn RealtimeStore>,
        events: EventBus,
        locations_url: String,
    ) -> Arc<Self> {
        Arc::new(Self {
            db,
            api,
            store,
            events,
            http: reqwest::Client::new(),
            locations_url,
            locations: RwLock::new(Vec::new()),
            selection: Mutex::new(SelectionContext::default()),
            viewport: RwLock::new(Viewport {
                center: DEFAULT_CENTER,
                zoom: DEFAULT_ZOOM,
            }),
            online: RwLock::new(true),
            loaded: AtomicBool::new(false),
            users: Arc::new(UserCache::new()),
        })
    }

    /// Fetch the static location feed and materialize the entities
    ///
    /// A no-op once a load has succeeded; failures leave the view empty
    /// until the connectivity watcher retries.
    pub async fn load(self: &Arc<Self>) -> Result<()> {
        if self.loaded.load(Ordering::SeqCst) {
            return Ok(());
        }

        let feed: LocationFeed = self
            .http
            .get(&self.locations_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Fetch(format!("location feed fetch failed: {}", e)))?
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("location feed parse failed: {}", e)))?;

        self.populate(feed.locations).await;
        Ok(())
    }

    /// Materialize location entities from feed data (the tail of `load`,
    /// also driven directly by tests)
    pub async fn populate(self: &Arc<Self>, data: Vec<LocationData>) {
        let mut list = Vec::with_capacity(data.len());
        for entry in data {
            let info = VenueInfoCache::hydrate(
                self.db.clone(),
                Arc::clone(&self.api),
                entry.venue_id.clone(),
            )
            .await;
            list.push(MapLocation::new(entry, info, self.events.clone()));
        }

        let count = list.len();
        {
            let mut locations = self.locations.write().await;
            *locations = list.clone();
        }
        self.loaded.store(true, Ordering::SeqCst);
        info!("Location feed loaded ({} locations)", count);
        self.events.emit_lossy(AppEvent::LocationsLoaded {
            count,
            timestamp: Utc::now(),
        });

        // Stagger the initial marker drop-in
        for (index, location) in list.iter().enumerate() {
            location
                .set_visibility(true, Some(DROP_DELAY * index as u32))
                .await;
        }
    }

    /// Whether the static feed has loaded
    pub fn loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Ordered location list
    pub async fn locations(&self) -> Vec<Arc<MapLocation>> {
        self.locations.read().await.clone()
    }

    /// Look a location up by place identifier
    pub async fn find(&self, place_id: &str) -> Option<Arc<MapLocation>> {
        self.locations
            .read()
            .await
            .iter()
            .find(|l| l.place_id == place_id)
            .cloned()
    }

    /// Currently selected location, if any
    pub async fn selected(&self) -> Option<Arc<MapLocation>> {
        self.selection.lock().await.current.clone()
    }

    /// Derived selection flag for one location
    pub async fn is_selected(&self, location: &Arc<MapLocation>) -> bool {
        match &self.selection.lock().await.current {
            Some(current) => Arc::ptr_eq(current, location),
            None => false,
        }
    }

    /// Place the active comment subscription listens on, if any
    pub async fn subscribed_place_id(&self) -> Option<String> {
        self.selection
            .lock()
            .await
            .subscription
            .as_ref()
            .map(|s| s.place_id().to_string())
    }

    /// Current viewport
    pub async fn viewport(&self) -> Viewport {
        *self.viewport.read().await
    }

    /// Current online flag
    pub async fn online(&self) -> bool {
        *self.online.read().await
    }

    /// Change the selected location
    ///
    /// Tears down the previous selection's animation and comment
    /// subscription, then subscribes the new one and re-centers the
    /// viewport. Re-selecting the already-selected location is a no-op;
    /// at most one subscription is ever active.
    pub async fn change_location(&self, new: Option<Arc<MapLocation>>) -> Result<()> {
        let mut selection = self.selection.lock().await;

        if let (Some(previous), Some(next)) = (&selection.current, &new) {
            if Arc::ptr_eq(previous, next) {
                return Ok(());
            }
        }

        if let Some(previous) = selection.current.take() {
            // Dropping the subscription aborts its listener
            selection.subscription = None;
            previous.set_animation(None).await;
        }

        selection.current = new.clone();
        self.events.emit_lossy(AppEvent::SelectionChanged {
            place_id: new.as_ref().map(|l| l.place_id.clone()),
            timestamp: Utc::now(),
        });

        if let Some(location) = new {
            selection.subscription = Some(
                CommentSubscription::start(
                    Arc::clone(&self.store),
                    Arc::clone(&location),
                    Arc::clone(&self.users),
                    self.events.clone(),
                )
                .await?,
            );

            let viewport = {
                let mut viewport = self.viewport.write().await;
                viewport.center = location.position;
                viewport.zoom = SELECTED_ZOOM;
                *viewport
            };
            self.events.emit_lossy(AppEvent::ViewportChanged {
                center: viewport.center,
                zoom: viewport.zoom,
                timestamp: Utc::now(),
            });
        }

        Ok(())
    }

    /// Select a location by place identifier (marker/list click), or
    /// deselect with None
    ///
    /// Selection bounces the marker and triggers an enrichment load whose
    /// outcome is broadcast as a venue-info event.
    pub async fn select(self: &Arc<Self>, place_id: Option<&str>) -> Result<()> {
        let Some(place_id) = place_id else {
            return self.change_location(None).await;
        };

        let location = self
            .find(place_id)
            .await
            .ok_or_else(|| Error::NotFound(format!("unknown location: {}", place_id)))?;

        self.change_location(Some(Arc::clone(&location))).await?;
        location.set_animation(Some(MarkerAnimation::Bounce)).await;
        spawn_info_load(location, self.events.clone());
        Ok(())
    }

    /// Write the current user's comment for a place
    ///
    /// The echo arrives through the live comment subscription.
    pub async fn comment(&self, place_id: &str, user_id: &str, content: String) -> Result<()> {
        if self.find(place_id).await.is_none() {
            return Err(Error::NotFound(format!("unknown location: {}", place_id)));
        }

        let comment = StoredComment {
            user_id: user_id.to_string(),
            content,
            timestamp: Utc::now().timestamp_millis(),
        };
        self.store.write_comment(place_id, comment).await
    }

    /// Filter the location list by a case-insensitive title substring
    ///
    /// Matches become visible with a transient bounce; non-matches hide.
    pub async fn filter(&self, text: &str) {
        let needle = text.to_lowercase();
        for location in self.locations.read().await.iter() {
            if location.title.to_lowercase().contains(&needle) {
                location.set_visibility(true, None).await;
                location.bounce_once().await;
            } else {
                location.set_visibility(false, None).await;
            }
        }
    }

    /// Show every location again (search box cleared)
    pub async fn reset(&self) {
        for location in self.locations.read().await.iter() {
            location.set_visibility(true, None).await;
            location.bounce_once().await;
        }
    }

    /// Watch the store's connectivity signal
    ///
    /// On transition to online: retry the static feed if it never loaded,
    /// else re-trigger the selected location's enrichment when it is not
    /// Loaded yet.
    pub fn spawn_connectivity_watcher(self: &Arc<Self>) -> JoinHandle<()> {
        let view = Arc::clone(self);
        let mut rx = self.store.connectivity();

        tokio::spawn(async move {
            loop {
                if rx.changed().await.is_err() {
                    break;
                }
                let online = *rx.borrow_and_update();
                view.handle_connectivity(online).await;
            }
        })
    }

    async fn handle_connectivity(self: &Arc<Self>, online: bool) {
        {
            let mut flag = self.online.write().await;
            *flag = online;
        }
        self.events.emit_lossy(AppEvent::ConnectivityChanged {
            online,
            timestamp: Utc::now(),
        });

        if !online {
            return;
        }

        if !self.loaded() {
            // The feed never made it; try again now that we are back
            if let Err(e) = self.load().await {
                warn!("location feed reload failed: {}", e);
            }
        } else if let Some(location) = self.selected().await {
            if location.info.state().await != VenueState::Loaded {
                spawn_info_load(location, self.events.clone());
            }
        }
    }
}

/// Drive one enrichment load and broadcast the outcome
fn spawn_info_load(location: Arc<MapLocation>, events: EventBus) {
    tokio::spawn(async move {
        if let Err(e) = location.info.load().await {
            warn!(place_id = %location.place_id, "venue info load failed: {}", e);
        }
        events.emit_lossy(AppEvent::VenueInfoChanged {
            place_id: location.place_id.clone(),
            state: location.info.state().await,
            info: location.info.info().await,
            timestamp: Utc::now(),
        });
    });
}
