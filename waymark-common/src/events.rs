//! Event types and EventBus for the Waymark service
//!
//! Every observable state change is broadcast as an [`AppEvent`] so the
//! rendering layer can re-render reactively over SSE. Internal components
//! (connectivity watcher, auth session) subscribe to the same bus.

use crate::types::{CurrentUser, LatLng, LocationInfo, VenueState};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Marker animation cues understood by the rendering layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerAnimation {
    /// Drop-in animation used when a marker first lands on the map
    Drop,
    /// Bounce cue for search matches and the current selection
    Bounce,
}

/// Waymark event types
///
/// Events are broadcast via the EventBus and serialized for SSE
/// transmission with `type` as the discriminator tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AppEvent {
    /// Static location feed finished loading
    LocationsLoaded {
        /// Number of locations materialized
        count: usize,
        /// When the feed finished loading
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A location's filter visibility or marker attachment changed
    MarkerVisibility {
        /// Place identifier of the location
        place_id: String,
        /// Whether the location passes the current filter
        visible: bool,
        /// Whether the marker is attached to the map
        on_map: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A location's marker animation cue changed
    MarkerAnimationChanged {
        place_id: String,
        /// New cue; None reverts to the static marker presentation
        animation: Option<MarkerAnimation>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The selected location changed
    SelectionChanged {
        /// Newly selected place, or None on deselection
        place_id: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The map viewport was re-centered (selection change)
    ViewportChanged {
        center: LatLng,
        zoom: u8,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A location's venue enrichment state or values changed
    VenueInfoChanged {
        place_id: String,
        state: VenueState,
        info: LocationInfo,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A location's comment list was replaced by a new snapshot
    CommentsChanged {
        place_id: String,
        /// Size of the new snapshot; contents via GET /api/locations/{id}
        count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A commenter's public identity finished resolving
    UserResolved {
        user_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The current identity changed (sign-in, profile update, sign-out)
    AuthStateChanged {
        /// Current user, or None after sign-out
        user: Option<CurrentUser>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The realtime store's connectivity signal flipped
    ConnectivityChanged {
        online: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl AppEvent {
    /// Event type name used as the SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            AppEvent::LocationsLoaded { .. } => "LocationsLoaded",
            AppEvent::MarkerVisibility { .. } => "MarkerVisibility",
            AppEvent::MarkerAnimationChanged { .. } => "MarkerAnimationChanged",
            AppEvent::SelectionChanged { .. } => "SelectionChanged",
            AppEvent::ViewportChanged { .. } => "ViewportChanged",
            AppEvent::VenueInfoChanged { .. } => "VenueInfoChanged",
            AppEvent::CommentsChanged { .. } => "CommentsChanged",
            AppEvent::UserResolved { .. } => "UserResolved",
            AppEvent::AuthStateChanged { .. } => "AuthStateChanged",
            AppEvent::ConnectivityChanged { .. } => "ConnectivityChanged",
        }
    }
}

/// Central event distribution bus for application-wide events
///
/// Uses tokio::broadcast internally, providing non-blocking publish,
/// multiple concurrent subscribers and automatic cleanup when
/// subscribers drop.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    pub fn emit(&self, event: AppEvent) -> Result<usize, broadcast::error::SendError<AppEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anyone is listening
    pub fn emit_lossy(&self, event: AppEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
