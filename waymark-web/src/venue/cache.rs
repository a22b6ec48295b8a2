//! Per-location venue enrichment cache
//!
//! Small fetch/cache state machine: Fresh → Loading → Loaded | Error.
//! Concurrent loads converge on a single in-flight request; a successful
//! result persists to the `venue_cache` table and survives restarts.
//!
//! Each load attempt carries a monotonically increasing token; a
//! completion whose token no longer matches the cache is discarded
//! without touching state.

use futures::future::{BoxFuture, FutureExt, Shared};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use waymark_common::db::venue_cache;
use waymark_common::types::{LocationInfo, VenueState};

use super::{VenueApi, VenueError};

type InFlight = Shared<BoxFuture<'static, Result<LocationInfo, VenueError>>>;

/// Enrichment cache for one venue identifier
pub struct VenueInfoCache {
    venue_id: String,
    db: SqlitePool,
    api: Arc<dyn VenueApi>,
    inner: Arc<Mutex<CacheInner>>,
}

struct CacheInner {
    state: VenueState,
    info: LocationInfo,
    /// Current load token; stale completions compare against it
    token: u64,
    /// Present only while state is Loading
    in_flight: Option<InFlight>,
}

impl VenueInfoCache {
    /// Construct for one venue identifier, hydrating from the persistent
    /// cache: a stored row starts the cache in Loaded, otherwise Fresh.
    pub async fn hydrate(db: SqlitePool, api: Arc<dyn VenueApi>, venue_id: String) -> Self {
        let (state, info) = match venue_cache::get(&db, &venue_id).await {
            Ok(Some(info)) => (VenueState::Loaded, info),
            Ok(None) => (VenueState::Fresh, LocationInfo::default()),
            Err(e) => {
                warn!(venue_id = %venue_id, "venue cache probe failed: {}", e);
                (VenueState::Fresh, LocationInfo::default())
            }
        };

        Self {
            venue_id,
            db,
            api,
            inner: Arc::new(Mutex::new(CacheInner {
                state,
                info,
                token: 0,
                in_flight: None,
            })),
        }
    }

    /// The venue identifier this cache was constructed with
    pub fn venue_id(&self) -> &str {
        &self.venue_id
    }

    /// Current state
    pub async fn state(&self) -> VenueState {
        self.inner.lock().await.state
    }

    /// Current cached values; authoritative only when state is Loaded
    pub async fn info(&self) -> LocationInfo {
        self.inner.lock().await.info.clone()
    }

    /// Load venue info, fetching at most once however many callers arrive
    ///
    /// - Loaded: resolves immediately with the cached values, no network.
    /// - Loading: awaits the same in-flight request as every other caller.
    /// - Fresh/Error: starts one fetch; success persists and moves to
    ///   Loaded, failure moves to Error with the in-flight handle cleared.
    pub async fn load(&self) -> Result<LocationInfo, VenueError> {
        let fut = {
            let mut inner = self.inner.lock().await;
            match (inner.state, inner.in_flight.clone()) {
                (VenueState::Loaded, _) => return Ok(inner.info.clone()),
                (VenueState::Loading, Some(fut)) => fut,
                // Fresh, Error, or Loading with no handle (cannot normally
                // happen): start a fresh fetch.
                _ => self.begin_fetch(&mut inner),
            }
        };

        fut.await
    }

    fn begin_fetch(&self, inner: &mut CacheInner) -> InFlight {
        inner.state = VenueState::Loading;
        inner.token += 1;
        let token = inner.token;

        let api = Arc::clone(&self.api);
        let db = self.db.clone();
        let venue_id = self.venue_id.clone();
        let shared_inner = Arc::clone(&self.inner);

        let fut = async move {
            let result = api.fetch_venue(&venue_id).await;

            let mut inner = shared_inner.lock().await;
            if inner.token != token {
                // A newer load attempt superseded this one; leave its state alone.
                debug!(venue_id = %venue_id, "discarding stale venue fetch completion");
                return result;
            }

            inner.in_flight = None;
            match result {
                Ok(info) => {
                    if let Err(e) = venue_cache::put(&db, &venue_id, &info).await {
                        warn!(venue_id = %venue_id, "venue cache write failed: {}", e);
                    }
                    inner.state = VenueState::Loaded;
                    inner.info = info.clone();
                    Ok(info)
                }
                Err(e) => {
                    inner.state = VenueState::Error;
                    Err(e)
                }
            }
        }
        .boxed()
        .shared();

        inner.in_flight = Some(fut.clone());
        fut
    }
}
