//! Comment endpoints and comment presentation

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::view::MapLocation;
use crate::AppState;

/// One comment with its author resolved to current cache contents
#[derive(Debug, Serialize)]
pub struct CommentView {
    pub user_id: String,
    pub content: String,
    pub timestamp: i64,
    pub name: String,
    pub photo: String,
}

/// Snapshot a location's comment list for the API
pub async fn comment_views(location: &Arc<MapLocation>) -> Vec<CommentView> {
    let mut views = Vec::new();
    for comment in location.comments().await {
        let author = comment.author.read().await.clone();
        views.push(CommentView {
            user_id: comment.user_id,
            content: comment.content,
            timestamp: comment.timestamp,
            name: author.name,
            photo: author.photo,
        });
    }
    views
}

#[derive(Debug, Deserialize)]
struct CommentRequest {
    content: String,
}

/// POST /api/locations/{place_id}/comments
async fn post_comment(
    State(state): State<AppState>,
    Path(place_id): Path<String>,
    Json(request): Json<CommentRequest>,
) -> ApiResult<StatusCode> {
    let user = state.auth.current().await;
    if !user.logged_in() {
        return Err(ApiError::Unauthorized("sign in to comment".to_string()));
    }
    if request.content.trim().is_empty() {
        return Err(ApiError::BadRequest("comment content must not be empty".to_string()));
    }

    state.view.comment(&place_id, &user.id, request.content).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build comment routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/locations/:place_id/comments", post(post_comment))
}
