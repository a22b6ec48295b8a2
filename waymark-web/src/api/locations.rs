//! Location listing, selection and filtering endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use waymark_common::events::MarkerAnimation;
use waymark_common::types::{LatLng, VenueState};

use crate::api::comments::{comment_views, CommentView};
use crate::error::ApiResult;
use crate::view::{MapLocation, Viewport};
use crate::AppState;

/// One location as exposed to the rendering layer
#[derive(Debug, Serialize)]
pub struct LocationView {
    pub place_id: String,
    pub title: String,
    pub position: LatLng,
    pub visible: bool,
    pub on_map: bool,
    pub animation: Option<MarkerAnimation>,
    pub selected: bool,
    pub venue_state: VenueState,
    pub photo: String,
    pub tip: String,
}

async fn location_view(state: &AppState, location: &Arc<MapLocation>) -> LocationView {
    let marker = location.marker().await;
    let info = location.info.info().await;

    LocationView {
        place_id: location.place_id.clone(),
        title: location.title.clone(),
        position: location.position,
        visible: marker.visible,
        on_map: marker.on_map,
        animation: marker.animation,
        selected: state.view.is_selected(location).await,
        venue_state: location.info.state().await,
        photo: info.photo,
        tip: info.tip,
    }
}

#[derive(Debug, Serialize)]
struct LocationsResponse {
    locations: Vec<LocationView>,
    viewport: Viewport,
    online: bool,
    loaded: bool,
}

/// GET /api/locations
async fn list_locations(State(state): State<AppState>) -> ApiResult<Json<LocationsResponse>> {
    let mut locations = Vec::new();
    for location in state.view.locations().await {
        locations.push(location_view(&state, &location).await);
    }

    Ok(Json(LocationsResponse {
        locations,
        viewport: state.view.viewport().await,
        online: state.view.online().await,
        loaded: state.view.loaded(),
    }))
}

#[derive(Debug, Serialize)]
struct LocationDetail {
    #[serde(flatten)]
    location: LocationView,
    comments: Vec<CommentView>,
}

/// GET /api/locations/{place_id}
async fn get_location(
    State(state): State<AppState>,
    Path(place_id): Path<String>,
) -> ApiResult<Json<LocationDetail>> {
    let location = state
        .view
        .find(&place_id)
        .await
        .ok_or_else(|| crate::ApiError::NotFound(format!("unknown location: {}", place_id)))?;

    Ok(Json(LocationDetail {
        location: location_view(&state, &location).await,
        comments: comment_views(&location).await,
    }))
}

#[derive(Debug, Deserialize)]
struct SelectionRequest {
    /// Place to select, or None to deselect
    place_id: Option<String>,
}

/// PUT /api/selection
async fn put_selection(
    State(state): State<AppState>,
    Json(request): Json<SelectionRequest>,
) -> ApiResult<StatusCode> {
    state.view.select(request.place_id.as_deref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct FilterRequest {
    /// Search text; empty or absent resets the filter
    query: Option<String>,
}

/// POST /api/filter
async fn filter_locations(
    State(state): State<AppState>,
    Json(request): Json<FilterRequest>,
) -> ApiResult<StatusCode> {
    match request.query.as_deref() {
        Some(query) if !query.is_empty() => state.view.filter(query).await,
        _ => state.view.reset().await,
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Build location routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/locations", get(list_locations))
        .route("/api/locations/:place_id", get(get_location))
        .route("/api/selection", put(put_selection))
        .route("/api/filter", post(filter_locations))
}
