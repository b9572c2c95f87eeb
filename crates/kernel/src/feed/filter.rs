//! Filter compilation.
//!
//! Turns the optional feed dimensions into a single [`PostPredicate`]. The
//! only store access is the author username lookup.

use thiserror::Error;
use uuid::Uuid;

use super::types::{FeedFilter, PostPredicate, dedup_ids};
use crate::error::AppError;
use crate::store::ContentStore;

/// Failures while compiling a feed filter.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The `author` dimension named a user that does not exist.
    #[error("author not found: {0}")]
    AuthorNotFound(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<FeedError> for AppError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::AuthorNotFound(_) => AppError::not_found("author not found"),
            FeedError::Store(e) => AppError::Store(e),
        }
    }
}

/// Compile a filter, resolving the author username through the store.
///
/// An unknown author short-circuits with [`FeedError::AuthorNotFound`]
/// instead of producing a predicate that can never match.
pub async fn compile(
    store: &dyn ContentStore,
    filter: &FeedFilter,
) -> Result<PostPredicate, FeedError> {
    let author_id = match filter.author.as_deref() {
        Some(username) => {
            let user = store
                .find_user_by_username(username)
                .await?
                .ok_or_else(|| FeedError::AuthorNotFound(username.to_string()))?;
            Some(user.id)
        }
        None => None,
    };

    Ok(compile_with_author(filter, author_id))
}

/// Compile a filter whose author has already been resolved.
pub fn compile_with_author(filter: &FeedFilter, author_id: Option<Uuid>) -> PostPredicate {
    PostPredicate {
        category: filter.category.clone(),
        title_contains: filter
            .search
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string),
        user_id: author_id,
        ids: filter.saved_ids.as_deref().map(dedup_ids),
        exclude_ids: Vec::new(),
        featured_only: filter.featured_only,
        created_since: None,
    }
}
