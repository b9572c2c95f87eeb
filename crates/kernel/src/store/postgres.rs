//! PostgreSQL implementation of ContentStore.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::ContentStore;
use crate::db;
use crate::feed::{FeedQueryBuilder, PostOrder, PostPredicate};
use crate::models::{
    AuthorInfo, Comment, CommentWithAuthor, CreateComment, CreatePost, CreateUser, Post,
    PostWithAuthor, User,
};

/// Post row joined with the owner columns the feed queries select.
#[derive(sqlx::FromRow)]
struct PostAuthorRow {
    #[sqlx(flatten)]
    post: Post,
    author_username: String,
    author_img: Option<String>,
}

impl From<PostAuthorRow> for PostWithAuthor {
    fn from(row: PostAuthorRow) -> Self {
        Self {
            author: AuthorInfo {
                id: row.post.user_id,
                username: row.author_username,
                img: row.author_img,
            },
            post: row.post,
        }
    }
}

/// Database-backed content store.
#[derive(Clone)]
pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_with_author(&self, sql: &str) -> Result<Vec<PostWithAuthor>> {
        let rows = sqlx::query_as::<_, PostAuthorRow>(sql)
            .fetch_all(&self.pool)
            .await
            .context("failed to execute feed query")?;

        Ok(rows.into_iter().map(PostWithAuthor::from).collect())
    }
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        User::find_by_id(&self.pool, id).await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        User::find_by_username(&self.pool, username).await
    }

    async fn find_user_by_external_id(&self, external_id: &str) -> Result<Option<User>> {
        User::find_by_external_id(&self.pool, external_id).await
    }

    async fn provision_user(&self, input: CreateUser) -> Result<User> {
        User::provision(&self.pool, input).await
    }

    async fn toggle_saved_post(&self, user_id: Uuid, post_id: Uuid) -> Result<Option<bool>> {
        User::toggle_saved_post(&self.pool, user_id, post_id).await
    }

    async fn find_posts(
        &self,
        predicate: &PostPredicate,
        order: &PostOrder,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostWithAuthor>> {
        let sql = FeedQueryBuilder::new(predicate).build_page(order, offset, limit);
        tracing::debug!(sql = %sql, "feed page query");
        self.fetch_with_author(&sql).await
    }

    async fn count_posts(&self, predicate: &PostPredicate) -> Result<u64> {
        let sql = FeedQueryBuilder::new(predicate).build_count();
        tracing::debug!(sql = %sql, "feed count query");

        let count: i64 = sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .context("failed to execute feed count query")?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn sample_posts(
        &self,
        predicate: &PostPredicate,
        size: u64,
    ) -> Result<Vec<PostWithAuthor>> {
        if size == 0 {
            return Ok(Vec::new());
        }
        let sql = FeedQueryBuilder::new(predicate).build_sample(size);
        self.fetch_with_author(&sql).await
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>> {
        Post::find_by_id(&self.pool, id).await
    }

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<PostWithAuthor>> {
        let row = sqlx::query_as::<_, PostAuthorRow>(
            r#"
            SELECT p.id, p.user_id, p.title, p.slug, p.description, p.category, p.content,
                   p.is_featured, p.visits, p.img, p.created, p.changed,
                   u.username AS author_username, u.img AS author_img
            FROM post p
            INNER JOIN users u ON u.id = p.user_id
            WHERE p.slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch post by slug")?;

        Ok(row.map(PostWithAuthor::from))
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool> {
        Post::slug_exists(&self.pool, slug).await
    }

    async fn insert_post(&self, input: CreatePost) -> Result<Post> {
        Post::create(&self.pool, input).await
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool> {
        Post::delete(&self.pool, id).await
    }

    async fn toggle_featured(&self, id: Uuid) -> Result<Option<Post>> {
        Post::toggle_featured(&self.pool, id).await
    }

    async fn increment_visits(&self, slug: &str) -> Result<()> {
        Post::increment_visits(&self.pool, slug).await
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>> {
        Comment::list_for_post(&self.pool, post_id).await
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        Comment::find_by_id(&self.pool, id).await
    }

    async fn insert_comment(&self, input: CreateComment) -> Result<Comment> {
        Comment::create(&self.pool, input).await
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool> {
        Comment::delete(&self.pool, id).await
    }

    async fn ping(&self) -> bool {
        db::check_health(&self.pool).await
    }
}
