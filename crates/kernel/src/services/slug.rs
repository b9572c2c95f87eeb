//! Slug resolution for new posts.
//!
//! A slug is the lower-cased title with spaces turned into hyphens. If that
//! is taken, `-2`, `-3`, ... are appended to the base until a free candidate
//! turns up. Resolution does not reserve anything: two concurrent creators
//! can resolve the same slug, and the unique index on `post.slug` rejects
//! the second insert.

use crate::error::{AppError, AppResult};
use crate::store::ContentStore;

/// First numeric suffix tried after the bare base.
const FIRST_SUFFIX: u64 = 2;

/// Derive the base candidate from a title.
pub fn base_slug(title: &str) -> String {
    title.trim().to_lowercase().replace(' ', "-")
}

fn candidate(base: &str, suffix: u64) -> String {
    if suffix < FIRST_SUFFIX {
        base.to_string()
    } else {
        format!("{base}-{suffix}")
    }
}

fn next_suffix(suffix: u64) -> u64 {
    if suffix < FIRST_SUFFIX {
        FIRST_SUFFIX
    } else {
        suffix + 1
    }
}

/// Resolve a collision-free slug for `title` against the store.
///
/// Returns the base itself when free, otherwise the smallest suffix `n >= 2`
/// for which `base-n` is free. Issues one existence check per colliding
/// candidate plus one for the winner.
pub async fn resolve_slug(store: &dyn ContentStore, title: &str) -> AppResult<String> {
    let base = base_slug(title);
    if base.is_empty() {
        return Err(AppError::invalid("title must not be empty"));
    }

    let mut suffix = 1;
    loop {
        let slug = candidate(&base, suffix);
        if !store.slug_exists(&slug).await? {
            if suffix > 1 {
                tracing::debug!(base = %base, slug = %slug, "slug collision resolved");
            }
            return Ok(slug);
        }
        suffix = next_suffix(suffix);
    }
}
