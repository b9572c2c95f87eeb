//! Comment model for discussions on posts.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::post::AuthorInfo;

/// Comment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Parent post ID.
    pub post_id: Uuid,

    /// Author user ID.
    pub user_id: Uuid,

    /// Comment body.
    pub body: String,

    /// Unix timestamp when created.
    pub created: i64,

    /// Unix timestamp when last changed.
    pub changed: i64,
}

/// A comment joined with its author's summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: AuthorInfo,
}

/// Input for creating a comment.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateComment {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    #[sqlx(flatten)]
    comment: Comment,
    author_username: String,
    author_img: Option<String>,
}

impl From<CommentRow> for CommentWithAuthor {
    fn from(row: CommentRow) -> Self {
        Self {
            author: AuthorInfo {
                id: row.comment.user_id,
                username: row.author_username,
                img: row.author_img,
            },
            comment: row.comment,
        }
    }
}

impl Comment {
    /// Create a new comment.
    pub async fn create(pool: &PgPool, input: CreateComment) -> Result<Self> {
        let id = Uuid::now_v7();
        let now = chrono::Utc::now().timestamp();

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comment (id, post_id, user_id, body, created, changed)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, post_id, user_id, body, created, changed
            "#,
        )
        .bind(id)
        .bind(input.post_id)
        .bind(input.user_id)
        .bind(&input.body)
        .bind(now)
        .fetch_one(pool)
        .await
        .context("failed to create comment")?;

        Ok(comment)
    }

    /// Find a comment by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let comment = sqlx::query_as::<_, Comment>(
            "SELECT id, post_id, user_id, body, created, changed FROM comment WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch comment by id")?;

        Ok(comment)
    }

    /// List comments for a post, newest first, with their authors.
    pub async fn list_for_post(pool: &PgPool, post_id: Uuid) -> Result<Vec<CommentWithAuthor>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT c.id, c.post_id, c.user_id, c.body, c.created, c.changed,
                   u.username AS author_username, u.img AS author_img
            FROM comment c
            INNER JOIN users u ON u.id = c.user_id
            WHERE c.post_id = $1
            ORDER BY c.created DESC, c.id DESC
            "#,
        )
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("failed to list comments for post")?;

        Ok(rows.into_iter().map(CommentWithAuthor::from).collect())
    }

    /// Delete a comment.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comment WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to delete comment")?;

        Ok(result.rows_affected() > 0)
    }
}
