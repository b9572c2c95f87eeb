//! Feed assembly.
//!
//! Both feeds run the same pipeline: compile the filter, resolve the sort
//! (which may narrow the predicate), then page.

use std::sync::Arc;

use tracing::debug;

use super::filter;
use super::pager::{FeedPage, PageRequest, fetch_page};
use super::sort::FeedSort;
use super::types::{FeedFilter, FeedParams};
use crate::error::AppResult;
use crate::models::User;
use crate::store::ContentStore;

/// Service for the public and saved-posts feeds.
#[derive(Clone)]
pub struct FeedService {
    store: Arc<dyn ContentStore>,
}

impl FeedService {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// The public feed.
    pub async fn public_feed(&self, params: &FeedParams, now: i64) -> AppResult<FeedPage> {
        self.assemble(params.filter(), params, now).await
    }

    /// Posts saved by `user`, filtered and paged like the public feed.
    ///
    /// `hasMore` is computed against the saved-and-filtered total.
    pub async fn saved_feed(
        &self,
        user: &User,
        params: &FeedParams,
        now: i64,
    ) -> AppResult<FeedPage> {
        if user.saved_posts.is_empty() {
            return Ok(FeedPage::empty());
        }

        let filter = FeedFilter {
            saved_ids: Some(user.saved_posts.clone()),
            ..params.filter()
        };
        self.assemble(filter, params, now).await
    }

    async fn assemble(
        &self,
        filter: FeedFilter,
        params: &FeedParams,
        now: i64,
    ) -> AppResult<FeedPage> {
        let predicate = filter::compile(self.store.as_ref(), &filter).await?;

        let sort = FeedSort::parse(params.sort.as_deref());
        let (predicate, order) = sort.resolve(predicate, now);

        let request = PageRequest::from_raw(params.page.as_deref(), params.limit.as_deref());
        let page = fetch_page(self.store.as_ref(), &predicate, &order, request).await?;

        debug!(
            ?sort,
            page = request.page,
            limit = request.limit,
            total = page.total,
            "feed assembled"
        );

        Ok(page)
    }
}
