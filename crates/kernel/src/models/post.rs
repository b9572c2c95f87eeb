//! Post model and CRUD operations.
//!
//! Posts are the authored content records. The slug is assigned once at
//! creation and never recomputed; the visit counter only ever grows.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Category assigned when the author does not pick one.
pub const DEFAULT_CATEGORY: &str = "general";

/// Post record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Owning user ID.
    pub user_id: Uuid,

    /// Post title.
    pub title: String,

    /// URL-safe unique identifier derived from the title.
    pub slug: String,

    /// Short summary shown in listings.
    pub description: Option<String>,

    /// Category machine name.
    pub category: String,

    /// Body content.
    pub content: String,

    /// Featured on the front page.
    pub is_featured: bool,

    /// Visit counter.
    pub visits: i64,

    /// Media host reference for the cover image.
    pub img: Option<String>,

    /// Unix timestamp when created.
    pub created: i64,

    /// Unix timestamp when last changed.
    pub changed: i64,
}

/// Owner summary embedded in post and comment responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorInfo {
    pub id: Uuid,
    pub username: String,
    pub img: Option<String>,
}

/// A post joined with its owner's summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostWithAuthor {
    #[serde(flatten)]
    pub post: Post,
    pub author: AuthorInfo,
}

/// Input for creating a new post.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePost {
    pub user_id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub content: String,
    pub img: Option<String>,
}

const POST_COLUMNS: &str =
    "id, user_id, title, slug, description, category, content, is_featured, visits, img, created, changed";

impl Post {
    /// Find a post by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let post = sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM post WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch post by id")?;

        Ok(post)
    }

    /// Check whether a slug is already taken.
    pub async fn slug_exists(pool: &PgPool, slug: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM post WHERE slug = $1)")
            .bind(slug)
            .fetch_one(pool)
            .await
            .context("failed to check slug")?;

        Ok(exists)
    }

    /// Create a new post.
    ///
    /// A unique violation on the slug index surfaces as [`SlugTaken`] inside
    /// the returned error so callers can re-resolve and retry.
    pub async fn create(pool: &PgPool, input: CreatePost) -> Result<Self> {
        let id = Uuid::now_v7();
        let now = chrono::Utc::now().timestamp();
        let category = input
            .category
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        let result = sqlx::query_as::<_, Post>(&format!(
            r#"
            INSERT INTO post (id, user_id, title, slug, description, category, content, is_featured, visits, img, created, changed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, 0, $8, $9, $9)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(input.user_id)
        .bind(&input.title)
        .bind(&input.slug)
        .bind(&input.description)
        .bind(&category)
        .bind(&input.content)
        .bind(&input.img)
        .bind(now)
        .fetch_one(pool)
        .await;

        match result {
            Ok(post) => Ok(post),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(SlugTaken(input.slug).into())
            }
            Err(e) => Err(anyhow::Error::new(e).context("failed to create post")),
        }
    }

    /// Flip the featured flag, returning the updated post.
    pub async fn toggle_featured(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let now = chrono::Utc::now().timestamp();
        let post = sqlx::query_as::<_, Post>(&format!(
            "UPDATE post SET is_featured = NOT is_featured, changed = $2 WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(now)
        .fetch_optional(pool)
        .await
        .context("failed to toggle featured flag")?;

        Ok(post)
    }

    /// Increment the visit counter of the post with this slug.
    pub async fn increment_visits(pool: &PgPool, slug: &str) -> Result<()> {
        sqlx::query("UPDATE post SET visits = visits + 1 WHERE slug = $1")
            .bind(slug)
            .execute(pool)
            .await
            .context("failed to increment visits")?;

        Ok(())
    }

    /// Delete a post and prune it from every saved list.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let mut tx = pool.begin().await.context("failed to start transaction")?;

        let result = sqlx::query("DELETE FROM post WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("failed to delete post")?;

        sqlx::query(
            "UPDATE users SET saved_posts = array_remove(saved_posts, $1) WHERE $1 = ANY(saved_posts)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("failed to prune saved posts")?;

        tx.commit().await.context("failed to commit post delete")?;

        Ok(result.rows_affected() > 0)
    }
}

/// Raised when a post insert collides with an existing slug.
#[derive(Debug, thiserror::Error)]
#[error("slug already taken: {0}")]
pub struct SlugTaken(pub String);

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn post_serializes_with_camel_case_keys() {
        let post = Post {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            title: "Hello".into(),
            slug: "hello".into(),
            description: None,
            category: DEFAULT_CATEGORY.into(),
            content: "body".into(),
            is_featured: true,
            visits: 3,
            img: None,
            created: 1,
            changed: 2,
        };

        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["isFeatured"], true);
        assert_eq!(json["userId"], post.user_id.to_string());
        assert!(json.get("is_featured").is_none());
        assert!(json.get("user_id").is_none());

        let author = AuthorInfo {
            id: post.user_id,
            username: "alice".into(),
            img: None,
        };
        let joined = serde_json::to_value(PostWithAuthor { post, author }).unwrap();
        assert_eq!(joined["isFeatured"], true);
        assert_eq!(joined["author"]["username"], "alice");
    }
}
