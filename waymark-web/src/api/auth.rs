//! Auth session endpoints
//!
//! The identity-provider popup flow happens in the browser; the resulting
//! identity assertion is posted here.

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use waymark_common::types::{CurrentUser, ProviderIdentity};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
struct SessionResponse {
    logged_in: bool,
    user: CurrentUser,
}

/// GET /api/auth/session
async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let user = state.auth.current().await;
    Json(SessionResponse {
        logged_in: user.logged_in(),
        user,
    })
}

/// POST /api/auth/session (sign-in)
async fn post_session(
    State(state): State<AppState>,
    Json(identity): Json<ProviderIdentity>,
) -> ApiResult<StatusCode> {
    if identity.id.trim().is_empty() {
        return Err(ApiError::BadRequest("identity id must not be empty".to_string()));
    }

    state.auth.sign_in(identity).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/auth/session (sign-out)
async fn delete_session(State(state): State<AppState>) -> StatusCode {
    state.auth.sign_out().await;
    StatusCode::NO_CONTENT
}

/// Build auth routes
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/api/auth/session",
        get(get_session).post(post_session).delete(delete_session),
    )
}
