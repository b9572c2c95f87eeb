//! Paging over a compiled predicate and ordering.

use anyhow::Result;
use serde::Serialize;

use super::types::{PostOrder, PostPredicate};
use crate::models::PostWithAuthor;
use crate::store::ContentStore;

/// Page used when the request gives none (1-based).
pub const DEFAULT_PAGE: u64 = 1;

/// Page size used when the request gives none.
pub const DEFAULT_LIMIT: u64 = 2;

/// Largest page size a client may request.
pub const MAX_LIMIT: u64 = 100;

/// A normalised page request. Both values are always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Build a request, replacing values below 1 with the defaults and
    /// capping the limit.
    pub fn new(page: i64, limit: i64) -> Self {
        let page = u64::try_from(page)
            .ok()
            .filter(|p| *p > 0)
            .unwrap_or(DEFAULT_PAGE);
        let limit = u64::try_from(limit)
            .ok()
            .filter(|l| *l > 0)
            .map_or(DEFAULT_LIMIT, |l| l.min(MAX_LIMIT));
        Self { page, limit }
    }

    /// Parse raw query-string values. Absent or non-numeric input falls back
    /// to the defaults.
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |raw: Option<&str>| raw.and_then(|v| v.trim().parse::<i64>().ok());
        Self::new(
            parse(page).unwrap_or(DEFAULT_PAGE as i64),
            parse(limit).unwrap_or(DEFAULT_LIMIT as i64),
        )
    }

    /// Number of matching items skipped before this page.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Whether matching items remain after this page.
    pub fn has_more(&self, total: u64) -> bool {
        self.page.saturating_mul(self.limit) < total
    }
}

/// One page of feed results.
#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
    pub posts: Vec<PostWithAuthor>,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
    /// Matching items across all pages.
    #[serde(skip)]
    pub total: u64,
}

impl FeedPage {
    pub fn new(posts: Vec<PostWithAuthor>, total: u64, request: PageRequest) -> Self {
        Self {
            posts,
            has_more: request.has_more(total),
            total,
        }
    }

    /// A page with no results.
    pub fn empty() -> Self {
        Self {
            posts: Vec::new(),
            has_more: false,
            total: 0,
        }
    }
}

/// Fetch one window of posts together with the total count.
///
/// Both queries run under the same predicate value, so `hasMore` always
/// describes the filtered set being paged.
pub async fn fetch_page(
    store: &dyn ContentStore,
    predicate: &PostPredicate,
    order: &PostOrder,
    request: PageRequest,
) -> Result<FeedPage> {
    let (posts, total) = tokio::try_join!(
        store.find_posts(predicate, order, request.offset(), request.limit),
        store.count_posts(predicate),
    )?;

    Ok(FeedPage::new(posts, total, request))
}
