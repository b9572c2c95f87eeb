//! Comment routes.
//!
//! `GET` and `POST /comments/{post_id}` list and add comments on a post;
//! `DELETE /comments/{id}` removes one comment (owner or admin).

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use tracing::info;

use super::helpers::{MessageResponse, parse_id, require_user};
use crate::error::{AppError, AppResult};
use crate::middleware::Identity;
use crate::models::{AuthorInfo, CommentWithAuthor, CreateComment};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(alias = "body")]
    pub desc: String,
}

async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<Json<Vec<CommentWithAuthor>>> {
    let post_id = parse_id(&post_id, "post id")?;
    let comments = state.store().list_comments(post_id).await?;
    Ok(Json(comments))
}

async fn add_comment(
    State(state): State<AppState>,
    identity: Identity,
    Path(post_id): Path<String>,
    Json(request): Json<CreateCommentRequest>,
) -> AppResult<(StatusCode, Json<CommentWithAuthor>)> {
    let post_id = parse_id(&post_id, "post id")?;
    let user = require_user(&state, &identity).await?;

    let body = request.desc.trim();
    if body.is_empty() {
        return Err(AppError::invalid("comment must not be empty"));
    }

    if state.store().find_post(post_id).await?.is_none() {
        return Err(AppError::not_found("post not found"));
    }

    let comment = state
        .store()
        .insert_comment(CreateComment {
            post_id,
            user_id: user.id,
            body: body.to_string(),
        })
        .await?;

    info!(comment_id = %comment.id, post_id = %post_id, "comment created");

    Ok((
        StatusCode::CREATED,
        Json(CommentWithAuthor {
            comment,
            author: AuthorInfo {
                id: user.id,
                username: user.username,
                img: user.img,
            },
        }),
    ))
}

async fn delete_comment(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id(&id, "comment id")?;
    let store = state.store();

    if !identity.is_admin() {
        let user = require_user(&state, &identity).await?;
        let comment = store
            .find_comment(id)
            .await?
            .ok_or_else(|| AppError::not_found("comment not found"))?;
        if comment.user_id != user.id {
            return Err(AppError::forbidden("you can only delete your own comment"));
        }
    }

    if !store.delete_comment(id).await? {
        return Err(AppError::not_found("comment not found"));
    }

    info!(comment_id = %id, admin = identity.is_admin(), "comment deleted");
    Ok(Json(MessageResponse::new("comment deleted")))
}

/// Create the comments router.
pub fn router() -> Router<AppState> {
    // GET/POST take a post id, DELETE a comment id
    Router::new().route(
        "/comments/{id}",
        get(list_comments).post(add_comment).delete(delete_comment),
    )
}
