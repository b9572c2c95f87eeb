//! In-process ContentStore.
//!
//! Evaluates [`PostPredicate`] and [`PostOrder`] directly against the stored
//! records. Used by tests and for running the server without PostgreSQL.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use uuid::Uuid;

use super::ContentStore;
use crate::feed::{PostOrder, PostPredicate};
use crate::models::{
    AuthorInfo, Comment, CommentWithAuthor, CreateComment, CreatePost, CreateUser,
    DEFAULT_CATEGORY, Post, PostWithAuthor, SlugTaken, User,
};

struct Inner {
    users: Vec<User>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    rng: StdRng,
}

impl Inner {
    fn author(&self, user_id: Uuid) -> Option<AuthorInfo> {
        self.users.iter().find(|u| u.id == user_id).map(|u| AuthorInfo {
            id: u.id,
            username: u.username.clone(),
            img: u.img.clone(),
        })
    }

    fn with_author(&self, post: &Post) -> Option<PostWithAuthor> {
        self.author(post.user_id).map(|author| PostWithAuthor {
            post: post.clone(),
            author,
        })
    }

    /// Matching posts that have a resolvable owner.
    fn matching<'a>(&'a self, predicate: &'a PostPredicate) -> impl Iterator<Item = &'a Post> {
        self.posts
            .iter()
            .filter(move |p| predicate.matches(p) && self.author(p.user_id).is_some())
    }
}

/// Content store held entirely in memory.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    operations: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// A store whose random sampling is reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            inner: Mutex::new(Inner {
                users: Vec::new(),
                posts: Vec::new(),
                comments: Vec::new(),
                rng,
            }),
            operations: AtomicU64::new(0),
        }
    }

    /// Insert or replace a post as-is, bypassing slug and timestamp handling.
    pub fn put_post(&self, post: Post) {
        let mut inner = self.inner.lock();
        inner.posts.retain(|p| p.id != post.id);
        inner.posts.push(post);
    }

    /// Insert or replace a user as-is.
    pub fn put_user(&self, user: User) {
        let mut inner = self.inner.lock();
        inner.users.retain(|u| u.id != user.id);
        inner.users.push(user);
    }

    /// Number of [`ContentStore`] calls served so far.
    pub fn operations(&self) -> u64 {
        self.operations.load(Ordering::Relaxed)
    }

    fn record(&self) {
        self.operations.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        self.record();
        Ok(self.inner.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.record();
        let inner = self.inner.lock();
        Ok(inner.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_external_id(&self, external_id: &str) -> Result<Option<User>> {
        self.record();
        let inner = self.inner.lock();
        Ok(inner
            .users
            .iter()
            .find(|u| u.external_id == external_id)
            .cloned())
    }

    async fn provision_user(&self, input: CreateUser) -> Result<User> {
        self.record();
        let mut inner = self.inner.lock();

        if let Some(existing) = inner
            .users
            .iter()
            .find(|u| u.external_id == input.external_id)
        {
            return Ok(existing.clone());
        }
        if inner.users.iter().any(|u| u.username == input.username) {
            anyhow::bail!("username already taken: {}", input.username);
        }

        let user = User {
            id: Uuid::now_v7(),
            external_id: input.external_id,
            username: input.username,
            email: input.email,
            img: input.img,
            saved_posts: Vec::new(),
            created: chrono::Utc::now().timestamp(),
        };
        inner.users.push(user.clone());

        Ok(user)
    }

    async fn toggle_saved_post(&self, user_id: Uuid, post_id: Uuid) -> Result<Option<bool>> {
        self.record();
        let mut inner = self.inner.lock();

        let Some(user) = inner.users.iter_mut().find(|u| u.id == user_id) else {
            return Ok(None);
        };
        if user.has_saved(post_id) {
            user.saved_posts.retain(|id| *id != post_id);
            Ok(Some(false))
        } else {
            user.saved_posts.push(post_id);
            Ok(Some(true))
        }
    }

    async fn find_posts(
        &self,
        predicate: &PostPredicate,
        order: &PostOrder,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostWithAuthor>> {
        self.record();
        let inner = self.inner.lock();

        let mut matching: Vec<&Post> = inner.matching(predicate).collect();
        matching.sort_by(|a, b| order.compare(a, b));

        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|p| inner.with_author(p))
            .collect())
    }

    async fn count_posts(&self, predicate: &PostPredicate) -> Result<u64> {
        self.record();
        let inner = self.inner.lock();
        Ok(inner.matching(predicate).count() as u64)
    }

    async fn sample_posts(
        &self,
        predicate: &PostPredicate,
        size: u64,
    ) -> Result<Vec<PostWithAuthor>> {
        self.record();
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let mut pool: Vec<PostWithAuthor> = inner
            .matching(predicate)
            .filter_map(|p| inner.with_author(p))
            .collect();
        pool.shuffle(&mut inner.rng);
        pool.truncate(usize::try_from(size).unwrap_or(usize::MAX));

        Ok(pool)
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>> {
        self.record();
        Ok(self.inner.lock().posts.iter().find(|p| p.id == id).cloned())
    }

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<PostWithAuthor>> {
        self.record();
        let inner = self.inner.lock();
        Ok(inner
            .posts
            .iter()
            .find(|p| p.slug == slug)
            .and_then(|p| inner.with_author(p)))
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool> {
        self.record();
        Ok(self.inner.lock().posts.iter().any(|p| p.slug == slug))
    }

    async fn insert_post(&self, input: CreatePost) -> Result<Post> {
        self.record();
        let mut inner = self.inner.lock();

        if inner.posts.iter().any(|p| p.slug == input.slug) {
            return Err(SlugTaken(input.slug).into());
        }

        let now = chrono::Utc::now().timestamp();
        let post = Post {
            id: Uuid::now_v7(),
            user_id: input.user_id,
            title: input.title,
            slug: input.slug,
            description: input.description,
            category: input
                .category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            content: input.content,
            is_featured: false,
            visits: 0,
            img: input.img,
            created: now,
            changed: now,
        };
        inner.posts.push(post.clone());

        Ok(post)
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool> {
        self.record();
        let mut inner = self.inner.lock();

        let before = inner.posts.len();
        inner.posts.retain(|p| p.id != id);
        if inner.posts.len() == before {
            return Ok(false);
        }

        inner.comments.retain(|c| c.post_id != id);
        for user in inner.users.iter_mut() {
            user.saved_posts.retain(|saved| *saved != id);
        }

        Ok(true)
    }

    async fn toggle_featured(&self, id: Uuid) -> Result<Option<Post>> {
        self.record();
        let mut inner = self.inner.lock();

        Ok(inner.posts.iter_mut().find(|p| p.id == id).map(|post| {
            post.is_featured = !post.is_featured;
            post.changed = chrono::Utc::now().timestamp();
            post.clone()
        }))
    }

    async fn increment_visits(&self, slug: &str) -> Result<()> {
        self.record();
        let mut inner = self.inner.lock();

        if let Some(post) = inner.posts.iter_mut().find(|p| p.slug == slug) {
            post.visits = post.visits.saturating_add(1);
        }
        Ok(())
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>> {
        self.record();
        let inner = self.inner.lock();

        let mut comments: Vec<CommentWithAuthor> = inner
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .filter_map(|c| {
                inner.author(c.user_id).map(|author| CommentWithAuthor {
                    comment: c.clone(),
                    author,
                })
            })
            .collect();
        comments.sort_by(|a, b| {
            (b.comment.created, b.comment.id).cmp(&(a.comment.created, a.comment.id))
        });

        Ok(comments)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        self.record();
        Ok(self
            .inner
            .lock()
            .comments
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn insert_comment(&self, input: CreateComment) -> Result<Comment> {
        self.record();
        let mut inner = self.inner.lock();

        if !inner.posts.iter().any(|p| p.id == input.post_id) {
            anyhow::bail!("comment references missing post {}", input.post_id);
        }
        if !inner.users.iter().any(|u| u.id == input.user_id) {
            anyhow::bail!("comment references missing user {}", input.user_id);
        }

        let now = chrono::Utc::now().timestamp();
        let comment = Comment {
            id: Uuid::now_v7(),
            post_id: input.post_id,
            user_id: input.user_id,
            body: input.body,
            created: now,
            changed: now,
        };
        inner.comments.push(comment.clone());

        Ok(comment)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool> {
        self.record();
        let mut inner = self.inner.lock();

        let before = inner.comments.len();
        inner.comments.retain(|c| c.id != id);
        Ok(inner.comments.len() < before)
    }

    async fn ping(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn user(username: &str) -> CreateUser {
        CreateUser {
            external_id: format!("ext_{username}"),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            img: None,
        }
    }

    fn post(user_id: Uuid, slug: &str) -> CreatePost {
        CreatePost {
            user_id,
            title: slug.to_string(),
            slug: slug.to_string(),
            description: None,
            category: None,
            content: "body".to_string(),
            img: None,
        }
    }

    #[tokio::test]
    async fn provisioning_is_idempotent_on_external_id() {
        let store = MemoryStore::new();
        let first = store.provision_user(user("alice")).await.unwrap();
        let again = store.provision_user(user("alice")).await.unwrap();
        assert_eq!(first.id, again.id);
    }

    #[tokio::test]
    async fn duplicate_slug_is_rejected() {
        let store = MemoryStore::new();
        let alice = store.provision_user(user("alice")).await.unwrap();

        let created = store.insert_post(post(alice.id, "hello")).await.unwrap();
        assert_eq!(created.category, DEFAULT_CATEGORY);

        let err = store.insert_post(post(alice.id, "hello")).await.unwrap_err();
        assert!(err.downcast_ref::<SlugTaken>().is_some());
    }

    #[tokio::test]
    async fn orphaned_posts_are_invisible() {
        let store = MemoryStore::new();
        let alice = store.provision_user(user("alice")).await.unwrap();
        store.insert_post(post(alice.id, "owned")).await.unwrap();
        store.insert_post(post(Uuid::now_v7(), "orphan")).await.unwrap();

        let all = PostPredicate::all();
        assert_eq!(store.count_posts(&all).await.unwrap(), 1);
        assert_eq!(store.sample_posts(&all, 10).await.unwrap().len(), 1);
        assert!(store.find_post_by_slug("orphan").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_prunes_saved_lists_and_comments() {
        let store = MemoryStore::new();
        let alice = store.provision_user(user("alice")).await.unwrap();
        let created = store.insert_post(post(alice.id, "doomed")).await.unwrap();

        assert_eq!(
            store.toggle_saved_post(alice.id, created.id).await.unwrap(),
            Some(true)
        );
        store
            .insert_comment(CreateComment {
                post_id: created.id,
                user_id: alice.id,
                body: "first".to_string(),
            })
            .await
            .unwrap();

        assert!(store.delete_post(created.id).await.unwrap());
        assert!(!store.delete_post(created.id).await.unwrap());

        let alice = store.find_user(alice.id).await.unwrap().unwrap();
        assert!(alice.saved_posts.is_empty());
        assert!(store.list_comments(created.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn operations_are_counted() {
        let store = MemoryStore::new();
        assert_eq!(store.operations(), 0);
        store.slug_exists("x").await.unwrap();
        store.count_posts(&PostPredicate::all()).await.unwrap();
        assert_eq!(store.operations(), 2);
    }
}
