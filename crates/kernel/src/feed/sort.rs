//! Sort resolution.
//!
//! Maps the `sort` keyword to a [`PostOrder`]. "trending" is the one mode
//! that also narrows the predicate, so the resolver takes the compiled
//! predicate and hands back the one to page with.

use serde::{Deserialize, Serialize};

use super::types::{PostOrder, PostPredicate, SortDirection, SortField};

/// Trailing window for the trending sort.
pub const TRENDING_WINDOW_SECS: i64 = 30 * 24 * 60 * 60;

/// Feed sort modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSort {
    #[default]
    Newest,
    Oldest,
    Popular,
    Trending,
}

impl FeedSort {
    /// Parse a sort keyword. Missing or unrecognised keywords fall back to
    /// [`FeedSort::Newest`].
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("oldest") => FeedSort::Oldest,
            Some("popular") => FeedSort::Popular,
            Some("trending") => FeedSort::Trending,
            _ => FeedSort::Newest,
        }
    }

    /// Resolve into the predicate to page with and its ordering.
    ///
    /// `now` is the evaluation time in unix seconds.
    pub fn resolve(self, predicate: PostPredicate, now: i64) -> (PostPredicate, PostOrder) {
        match self {
            FeedSort::Newest => (predicate, PostOrder::NEWEST),
            FeedSort::Oldest => (
                predicate,
                PostOrder {
                    field: SortField::Created,
                    direction: SortDirection::Asc,
                },
            ),
            FeedSort::Popular => (predicate, by_visits()),
            FeedSort::Trending => (
                predicate.created_since(now - TRENDING_WINDOW_SECS),
                by_visits(),
            ),
        }
    }
}

fn by_visits() -> PostOrder {
    PostOrder {
        field: SortField::Visits,
        direction: SortDirection::Desc,
    }
}
