//! Content storage abstraction.
//!
//! Every read and write the feed engine, the slug resolver, the suggestion
//! sampler and the route handlers perform goes through [`ContentStore`].
//!
//! - [`PgContentStore`]: PostgreSQL via sqlx, feed queries via SeaQuery
//! - [`MemoryStore`]: in-process store for tests and local development

mod memory;
mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgContentStore;

use crate::feed::{PostOrder, PostPredicate};
use crate::models::{
    Comment, CommentWithAuthor, CreateComment, CreatePost, CreateUser, Post, PostWithAuthor, User,
};

/// Storage primitives for posts, comments and users.
///
/// Read paths that return posts to clients return [`PostWithAuthor`]; posts
/// whose owner cannot be resolved are left out rather than returned without
/// an author.
#[async_trait]
pub trait ContentStore: Send + Sync {
    // ---- Users ----

    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_user_by_external_id(&self, external_id: &str) -> Result<Option<User>>;

    /// Create a user from an identity provider event. Idempotent on
    /// `external_id`.
    async fn provision_user(&self, input: CreateUser) -> Result<User>;

    /// Toggle `post_id` in the user's saved list as one atomic step.
    ///
    /// Returns `Some(true)` if the post is now saved, `Some(false)` if it was
    /// removed, `None` if the user does not exist.
    async fn toggle_saved_post(&self, user_id: Uuid, post_id: Uuid) -> Result<Option<bool>>;

    // ---- Feed primitives ----

    /// One window of matching posts under `order`.
    async fn find_posts(
        &self,
        predicate: &PostPredicate,
        order: &PostOrder,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostWithAuthor>>;

    /// Number of posts matching `predicate`.
    async fn count_posts(&self, predicate: &PostPredicate) -> Result<u64>;

    /// Up to `size` matching posts in random order.
    async fn sample_posts(&self, predicate: &PostPredicate, size: u64)
    -> Result<Vec<PostWithAuthor>>;

    // ---- Posts ----

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>>;

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<PostWithAuthor>>;

    async fn slug_exists(&self, slug: &str) -> Result<bool>;

    /// Insert a post. A slug collision fails with
    /// [`SlugTaken`](crate::models::SlugTaken) inside the error.
    async fn insert_post(&self, input: CreatePost) -> Result<Post>;

    /// Delete a post, its comments, and every saved reference to it.
    async fn delete_post(&self, id: Uuid) -> Result<bool>;

    async fn toggle_featured(&self, id: Uuid) -> Result<Option<Post>>;

    async fn increment_visits(&self, slug: &str) -> Result<()>;

    // ---- Comments ----

    /// Comments on a post, newest first.
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>>;

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>>;

    async fn insert_comment(&self, input: CreateComment) -> Result<Comment>;

    async fn delete_comment(&self, id: Uuid) -> Result<bool>;

    /// Whether the backing store is reachable.
    async fn ping(&self) -> bool;
}
