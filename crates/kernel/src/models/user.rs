//! User model and CRUD operations.
//!
//! Users are only ever created from identity provider events. The
//! `external_id` is the join key between the provider and local records and
//! never changes after provisioning.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// User record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub external_id: String,
    pub username: String,
    pub email: String,
    pub img: Option<String>,
    /// Saved post references. Weak: entries may point at deleted posts.
    pub saved_posts: Vec<Uuid>,
    pub created: i64,
}

/// Input for provisioning a user from an identity provider event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateUser {
    pub external_id: String,
    pub username: String,
    pub email: String,
    pub img: Option<String>,
}

const USER_COLUMNS: &str = "id, external_id, username, email, img, saved_posts, created";

impl User {
    /// Whether this user has saved the given post.
    pub fn has_saved(&self, post_id: Uuid) -> bool {
        self.saved_posts.contains(&post_id)
    }

    /// Find a user by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch user by id")?;

        Ok(user)
    }

    /// Find a user by username.
    pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(pool)
        .await
        .context("failed to fetch user by username")?;

        Ok(user)
    }

    /// Find a user by identity provider key.
    pub async fn find_by_external_id(pool: &PgPool, external_id: &str) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE external_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch user by external id")?;

        Ok(user)
    }

    /// Provision a user. Replayed events for an existing `external_id`
    /// return the stored record unchanged.
    pub async fn provision(pool: &PgPool, input: CreateUser) -> Result<Self> {
        let id = Uuid::now_v7();
        let now = chrono::Utc::now().timestamp();

        let inserted = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, external_id, username, email, img, saved_posts, created)
            VALUES ($1, $2, $3, $4, $5, '{{}}', $6)
            ON CONFLICT (external_id) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&input.external_id)
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.img)
        .bind(now)
        .fetch_optional(pool)
        .await
        .context("failed to provision user")?;

        match inserted {
            Some(user) => Ok(user),
            None => Self::find_by_external_id(pool, &input.external_id)
                .await?
                .context("provisioned user vanished after conflict"),
        }
    }

    /// Toggle a post in the saved list in a single statement.
    ///
    /// Returns `Some(true)` when the post is now saved, `Some(false)` when it
    /// was removed, and `None` when the user does not exist.
    pub async fn toggle_saved_post(pool: &PgPool, id: Uuid, post_id: Uuid) -> Result<Option<bool>> {
        let saved: Option<bool> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET saved_posts = CASE
                WHEN $2 = ANY(saved_posts) THEN array_remove(saved_posts, $2)
                ELSE array_append(saved_posts, $2)
            END
            WHERE id = $1
            RETURNING $2 = ANY(saved_posts)
            "#,
        )
        .bind(id)
        .bind(post_id)
        .fetch_optional(pool)
        .await
        .context("failed to toggle saved post")?;

        Ok(saved)
    }
}
