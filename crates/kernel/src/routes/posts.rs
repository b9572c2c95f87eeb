//! Post routes.
//!
//! - `GET /posts`: public feed
//! - `POST /posts`: create a post
//! - `GET /posts/{slug}`: single post, counts a visit
//! - `DELETE /posts/{id}`: owner or admin
//! - `PATCH /posts/feature`: admin toggle of the featured flag
//! - `GET /posts/upload-auth`: media upload credential
//! - `GET /posts/suggestions`: related posts

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use serde::Deserialize;
use tracing::{info, warn};

use super::helpers::{MessageResponse, now, parse_id, require_user};
use crate::error::{AppError, AppResult};
use crate::feed::{FeedPage, FeedParams};
use crate::middleware::Identity;
use crate::models::{CreatePost, Post, PostWithAuthor, SlugTaken};
use crate::services::media::UploadCredential;
use crate::services::slug::resolve_slug;
use crate::services::suggestion::{SUGGESTION_SIZE, sample_suggestions};
use crate::state::AppState;

/// Attempts at inserting a post when a concurrent writer takes the slug.
const SLUG_ATTEMPTS: usize = 3;

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    #[serde(alias = "desc")]
    pub description: Option<String>,
    pub category: Option<String>,
    pub img: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostIdRequest {
    pub post_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionParams {
    pub category: Option<String>,
    pub current_post_id: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> AppResult<Json<FeedPage>> {
    let page = state.feed().public_feed(&params, now()).await?;
    Ok(Json(page))
}

async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<PostWithAuthor>> {
    let post = state
        .store()
        .find_post_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::not_found("post not found"))?;

    // Best effort: the response may show the count from before this visit
    let store = state.store_handle();
    tokio::spawn(async move {
        if let Err(e) = store.increment_visits(&slug).await {
            warn!(error = %e, slug = %slug, "failed to record visit");
        }
    });

    Ok(Json(post))
}

async fn create_post(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<CreatePostRequest>,
) -> AppResult<(StatusCode, Json<Post>)> {
    let user = require_user(&state, &identity).await?;

    if request.title.trim().is_empty() {
        return Err(AppError::invalid("title is required"));
    }
    if request.content.trim().is_empty() {
        return Err(AppError::invalid("content is required"));
    }

    for attempt in 1..=SLUG_ATTEMPTS {
        let slug = resolve_slug(state.store(), &request.title).await?;
        let input = CreatePost {
            user_id: user.id,
            title: request.title.clone(),
            slug,
            description: request.description.clone(),
            category: request.category.clone(),
            content: request.content.clone(),
            img: request.img.clone(),
        };

        match state.store().insert_post(input).await {
            Ok(post) => {
                info!(post_id = %post.id, slug = %post.slug, user_id = %user.id, "post created");
                return Ok((StatusCode::CREATED, Json(post)));
            }
            Err(e) if e.downcast_ref::<SlugTaken>().is_some() => {
                warn!(attempt, error = %e, "slug taken by a concurrent insert");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Conflict(
        "could not allocate a unique slug, try again".to_string(),
    ))
}

async fn delete_post(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id(&id, "post id")?;
    let store = state.store();

    if !identity.is_admin() {
        let user = require_user(&state, &identity).await?;
        let post = store
            .find_post(id)
            .await?
            .ok_or_else(|| AppError::not_found("post not found"))?;
        if post.user_id != user.id {
            return Err(AppError::forbidden("you can only delete your own post"));
        }
    }

    if !store.delete_post(id).await? {
        return Err(AppError::not_found("post not found"));
    }

    info!(post_id = %id, admin = identity.is_admin(), "post deleted");
    Ok(Json(MessageResponse::new("post deleted")))
}

async fn feature_post(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<PostIdRequest>,
) -> AppResult<Json<Post>> {
    if !identity.is_admin() {
        return Err(AppError::forbidden("admin role required"));
    }
    let id = parse_id(&request.post_id, "postId")?;

    let post = state
        .store()
        .toggle_featured(id)
        .await?
        .ok_or_else(|| AppError::not_found("post not found"))?;

    info!(post_id = %id, featured = post.is_featured, "featured flag toggled");
    Ok(Json(post))
}

async fn upload_auth(State(state): State<AppState>) -> AppResult<Json<UploadCredential>> {
    let signer = state
        .media()
        .ok_or_else(|| AppError::Unavailable("media uploads are not configured".to_string()))?;
    Ok(Json(signer.issue(now())?))
}

async fn suggestions(
    State(state): State<AppState>,
    Query(params): Query<SuggestionParams>,
) -> AppResult<Json<Vec<PostWithAuthor>>> {
    let current = params
        .current_post_id
        .ok_or_else(|| AppError::invalid("currentPostId is required"))?;

    let posts = sample_suggestions(
        state.store(),
        params.category.as_deref(),
        &current,
        SUGGESTION_SIZE,
    )
    .await?;

    Ok(Json(posts))
}

/// Create the posts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/upload-auth", get(upload_auth))
        .route("/posts/suggestions", get(suggestions))
        .route("/posts/feature", patch(feature_post))
        // GET takes a slug, DELETE an id
        .route("/posts/{key}", get(get_post).delete(delete_post))
}
