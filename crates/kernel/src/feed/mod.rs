//! Content feed query engine.
//!
//! This module provides:
//! - Filter compilation: optional dimensions to a [`PostPredicate`]
//! - Sort resolution: sort keyword to a [`PostOrder`]
//! - Paging: window math and `hasMore`
//! - FeedQueryBuilder: SeaQuery-based SQL generation
//! - FeedService: the public and saved-posts feeds

pub mod filter;
pub mod pager;
mod query_builder;
mod service;
pub mod sort;
pub mod types;

pub use filter::FeedError;
pub use pager::{DEFAULT_LIMIT, DEFAULT_PAGE, FeedPage, MAX_LIMIT, PageRequest};
pub use query_builder::FeedQueryBuilder;
pub use service::FeedService;
pub use sort::{FeedSort, TRENDING_WINDOW_SECS};
pub use types::{
    FeedFilter, FeedParams, PostOrder, PostPredicate, SortDirection, SortField,
};
