//! Shared data types for the Waymark service
//!
//! The static feed shapes keep the feed's own camelCase field names via
//! serde renames; everything internal is snake_case.

use serde::{Deserialize, Serialize};

/// Geographic coordinate (WGS84 degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// One entry of the static location feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationData {
    pub title: String,
    pub position: LatLng,
    #[serde(rename = "placeID")]
    pub place_id: String,
    #[serde(rename = "fourSquareID")]
    pub venue_id: String,
}

/// The static feed document fetched once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationFeed {
    pub locations: Vec<LocationData>,
}

/// Venue enrichment values (photo URL + top tip, either possibly empty)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    pub photo: String,
    pub tip: String,
}

/// Venue enrichment states exposed to the presentation layer
///
/// Photo/tip values are authoritative only in `Loaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VenueState {
    Fresh,
    Loading,
    Loaded,
    Error,
}

/// One comment as held by the realtime store (one per user per place)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredComment {
    pub user_id: String,
    pub content: String,
    /// Creation time, Unix epoch milliseconds
    pub timestamp: i64,
}

/// Publicly visible identity fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicProfile {
    pub name: String,
    pub photo: String,
}

/// Identity asserted by the external auth provider on sign-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderIdentity {
    pub id: String,
    pub name: String,
    pub email: String,
    pub photo: String,
}

/// Current signed-in user as exposed to the presentation layer
///
/// Always present; an empty identifier means nobody is signed in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub photo: String,
}

impl CurrentUser {
    /// Derived sign-in state (identifier non-empty)
    pub fn logged_in(&self) -> bool {
        !self.id.is_empty()
    }
}
