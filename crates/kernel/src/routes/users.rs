//! User routes: the saved-posts feed and the save toggle.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, patch},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::helpers::{now, parse_id, require_user};
use crate::error::{AppError, AppResult};
use crate::feed::{FeedPage, FeedParams};
use crate::middleware::Identity;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePostRequest {
    pub post_id: String,
}

#[derive(Debug, Serialize)]
pub struct SavePostResponse {
    pub saved: bool,
    pub message: &'static str,
}

async fn saved_posts(
    State(state): State<AppState>,
    identity: Identity,
    Query(params): Query<FeedParams>,
) -> AppResult<Json<FeedPage>> {
    let user = require_user(&state, &identity).await?;
    let page = state.feed().saved_feed(&user, &params, now()).await?;
    Ok(Json(page))
}

async fn toggle_saved(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<SavePostRequest>,
) -> AppResult<Json<SavePostResponse>> {
    let post_id = parse_id(&request.post_id, "postId")?;
    let user = require_user(&state, &identity).await?;

    // Unsaving a dangling reference is allowed; saving needs a live post
    if !user.has_saved(post_id) && state.store().find_post(post_id).await?.is_none() {
        return Err(AppError::not_found("post not found"));
    }

    let saved = state
        .store()
        .toggle_saved_post(user.id, post_id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    info!(user_id = %user.id, post_id = %post_id, saved, "saved posts toggled");

    Ok(Json(SavePostResponse {
        saved,
        message: if saved { "Post saved!" } else { "Post unsaved!" },
    }))
}

/// Create the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/saved", get(saved_posts))
        .route("/users/save", patch(toggle_saved))
}
