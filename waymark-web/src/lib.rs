//! waymark-web library interface
//!
//! Exposes the application state, router construction and the domain
//! modules for integration testing.

pub mod api;
pub mod auth;
pub mod error;
pub mod store;
pub mod venue;
pub mod view;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use waymark_common::events::EventBus;

use crate::auth::AuthSession;
use crate::store::RealtimeStore;
use crate::view::MainView;

/// Application state shared across handlers
///
/// Explicit single owner of everything the original kept in ambient
/// module globals: the view, the store, the event bus, the auth session.
#[derive(Clone)]
pub struct AppState {
    /// Service database connection pool
    pub db: SqlitePool,
    /// Event bus feeding the SSE stream
    pub event_bus: EventBus,
    /// Realtime comment/user store
    pub store: Arc<dyn RealtimeStore>,
    /// Application view (locations, selection, filtering)
    pub view: Arc<MainView>,
    /// Current identity and profile subscriptions
    pub auth: Arc<AuthSession>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        store: Arc<dyn RealtimeStore>,
        view: Arc<MainView>,
        auth: Arc<AuthSession>,
    ) -> Self {
        Self {
            db,
            event_bus,
            store,
            view,
            auth,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    Router::new()
        .merge(api::locations::routes())
        .merge(api::comments::routes())
        .merge(api::auth::routes())
        .merge(api::health::routes())
        .route("/events", get(api::sse::event_stream))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
