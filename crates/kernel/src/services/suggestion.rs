//! Related-post suggestions.
//!
//! Draws a random sample from the current post's category, then tops it up
//! from the whole pool when the category is too small. The current post and
//! anything already drawn are excluded from the second round.

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::feed::PostPredicate;
use crate::models::PostWithAuthor;
use crate::store::ContentStore;

/// Number of suggestions returned next to a post.
pub const SUGGESTION_SIZE: u64 = 4;

/// Sample up to `size` posts related to `current_post_id`.
///
/// A malformed `current_post_id` fails with `InvalidArgument` before the
/// store is touched. An empty result is a success.
pub async fn sample_suggestions(
    store: &dyn ContentStore,
    category: Option<&str>,
    current_post_id: &str,
    size: u64,
) -> AppResult<Vec<PostWithAuthor>> {
    let current = Uuid::parse_str(current_post_id.trim())
        .map_err(|_| AppError::invalid("currentPostId is not a valid id"))?;

    if size == 0 {
        return Ok(Vec::new());
    }

    let base = PostPredicate::all().excluding([current]);
    let category = category.map(str::trim).filter(|c| !c.is_empty());

    let mut selected = match category {
        Some(category) => {
            store
                .sample_posts(&base.clone().with_category(category), size)
                .await?
        }
        None => Vec::new(),
    };
    selected.truncate(usize::try_from(size).unwrap_or(usize::MAX));

    let shortfall = size.saturating_sub(selected.len() as u64);
    if shortfall > 0 {
        let relaxed = base.excluding(selected.iter().map(|p| p.post.id));
        let backfill = store.sample_posts(&relaxed, shortfall).await?;

        tracing::debug!(
            strict = selected.len(),
            backfill = backfill.len(),
            "suggestions backfilled"
        );
        selected.extend(backfill);
    }

    Ok(selected)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{CreatePost, CreateUser};
    use crate::store::MemoryStore;

    async fn seed(store: &MemoryStore, category: &str, count: usize) -> Vec<Uuid> {
        let owner = store
            .provision_user(CreateUser {
                external_id: "ext_owner".to_string(),
                username: "owner".to_string(),
                email: "owner@example.com".to_string(),
                img: None,
            })
            .await
            .unwrap();

        let mut ids = Vec::new();
        for i in 0..count {
            let post = store
                .insert_post(CreatePost {
                    user_id: owner.id,
                    title: format!("{category} {i}"),
                    slug: format!("{category}-{i}"),
                    description: None,
                    category: Some(category.to_string()),
                    content: "body".to_string(),
                    img: None,
                })
                .await
                .unwrap();
            ids.push(post.id);
        }
        ids
    }

    #[tokio::test]
    async fn malformed_id_fails_before_any_store_call() {
        let store = MemoryStore::new();
        let err = sample_suggestions(&store, Some("rust"), "not-a-uuid", SUGGESTION_SIZE)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidArgument(_)));
        assert_eq!(store.operations(), 0);
    }

    #[tokio::test]
    async fn empty_store_is_an_empty_success() {
        let store = MemoryStore::new();
        let result = sample_suggestions(
            &store,
            Some("rust"),
            &Uuid::now_v7().to_string(),
            SUGGESTION_SIZE,
        )
        .await
        .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn full_category_needs_no_backfill() {
        let store = MemoryStore::with_seed(7);
        let rust = seed(&store, "rust", 6).await;

        let result = sample_suggestions(&store, Some("rust"), &rust[0].to_string(), 4)
            .await
            .unwrap();

        assert_eq!(result.len(), 4);
        assert!(result.iter().all(|p| p.post.category == "rust"));
        assert!(result.iter().all(|p| p.post.id != rust[0]));
    }

    #[tokio::test]
    async fn missing_category_samples_the_whole_pool() {
        let store = MemoryStore::with_seed(11);
        let ids = seed(&store, "misc", 3).await;

        let result = sample_suggestions(&store, Some("  "), &ids[0].to_string(), 4)
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|p| p.post.id != ids[0]));
    }
}
