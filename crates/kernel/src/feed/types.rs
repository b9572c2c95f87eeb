//! Feed query engine types.
//!
//! - [`FeedParams`]: the raw query-string bag accepted by feed endpoints
//! - [`FeedFilter`]: the typed, optional filter dimensions
//! - [`PostPredicate`]: a compiled, conjunctive condition over posts
//! - [`PostOrder`]: attribute + direction ordering descriptor

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Post;

/// Raw feed query parameters, exactly as they arrive on the query string.
///
/// Everything is kept as an optional string so that malformed values can be
/// normalised instead of rejecting the whole request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub cat: Option<String>,
    pub search: Option<String>,
    pub author: Option<String>,
    pub sort: Option<String>,
    pub featured: Option<String>,
}

impl FeedParams {
    /// Extract the filter dimensions (without any saved-set restriction).
    pub fn filter(&self) -> FeedFilter {
        FeedFilter {
            category: non_blank(self.cat.as_deref()),
            search: non_blank(self.search.as_deref()),
            author: non_blank(self.author.as_deref()),
            saved_ids: None,
            featured_only: is_truthy(self.featured.as_deref()),
        }
    }
}

/// Optional, independently combinable filter dimensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedFilter {
    /// Exact category match.
    pub category: Option<String>,
    /// Case-insensitive substring match on the title.
    pub search: Option<String>,
    /// Author username, resolved to a user id at compile time.
    pub author: Option<String>,
    /// Restrict to these post ids (saved-posts feed only).
    pub saved_ids: Option<Vec<Uuid>>,
    /// Only featured posts.
    pub featured_only: bool,
}

/// A compiled condition selecting a subset of posts.
///
/// All present constraints are ANDed together. The default value has no
/// constraints and matches every post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostPredicate {
    pub category: Option<String>,
    pub title_contains: Option<String>,
    pub user_id: Option<Uuid>,
    /// Membership restriction. `Some(empty)` matches nothing.
    pub ids: Option<Vec<Uuid>>,
    pub exclude_ids: Vec<Uuid>,
    pub featured_only: bool,
    /// Inclusive lower bound on `created` (unix seconds).
    pub created_since: Option<i64>,
}

impl PostPredicate {
    /// The unconstrained predicate.
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether no dimension constrains this predicate.
    pub fn is_unconstrained(&self) -> bool {
        *self == Self::default()
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Add ids to the exclusion list, skipping ones already excluded.
    pub fn excluding(mut self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        for id in ids {
            if !self.exclude_ids.contains(&id) {
                self.exclude_ids.push(id);
            }
        }
        self
    }

    /// Narrow to posts created at or after `since`. An existing tighter
    /// bound is kept.
    pub fn created_since(mut self, since: i64) -> Self {
        self.created_since = Some(self.created_since.map_or(since, |s| s.max(since)));
        self
    }

    /// Evaluate the predicate against a single post.
    pub fn matches(&self, post: &Post) -> bool {
        if let Some(ref category) = self.category
            && post.category != *category
        {
            return false;
        }
        if let Some(ref needle) = self.title_contains
            && !post.title.to_lowercase().contains(&needle.to_lowercase())
        {
            return false;
        }
        if let Some(user_id) = self.user_id
            && post.user_id != user_id
        {
            return false;
        }
        if let Some(ref ids) = self.ids
            && !ids.contains(&post.id)
        {
            return false;
        }
        if self.exclude_ids.contains(&post.id) {
            return false;
        }
        if self.featured_only && !post.is_featured {
            return false;
        }
        if let Some(since) = self.created_since
            && post.created < since
        {
            return false;
        }
        true
    }
}

/// Attribute a feed can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Created,
    Visits,
}

impl SortField {
    /// Column name in the `post` table.
    pub fn column(self) -> &'static str {
        match self {
            SortField::Created => "created",
            SortField::Visits => "visits",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Ordering descriptor. Ties on the primary attribute are broken by post id
/// in the same direction, so the order is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostOrder {
    pub field: SortField,
    pub direction: SortDirection,
}

impl PostOrder {
    pub const NEWEST: PostOrder = PostOrder {
        field: SortField::Created,
        direction: SortDirection::Desc,
    };

    /// Compare two posts under this ordering.
    pub fn compare(&self, a: &Post, b: &Post) -> Ordering {
        let primary = match self.field {
            SortField::Created => a.created.cmp(&b.created),
            SortField::Visits => a.visits.cmp(&b.visits),
        };
        let ordering = primary.then_with(|| a.id.cmp(&b.id));
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

impl Default for PostOrder {
    fn default() -> Self {
        Self::NEWEST
    }
}

/// Trim a query value, treating blank strings as absent.
fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Presence flag semantics: any non-blank value except an explicit
/// `false`/`0` turns the flag on.
fn is_truthy(value: Option<&str>) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) => !v.is_empty() && v != "false" && v != "0",
        None => false,
    }
}

/// Remove duplicate ids, keeping first occurrences.
pub(crate) fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn post(title: &str, category: &str, created: i64, visits: i64) -> Post {
        Post {
            id: Uuid::now_v7(),
            user_id: Uuid::nil(),
            title: title.to_string(),
            slug: title.to_lowercase().replace(' ', "-"),
            description: None,
            category: category.to_string(),
            content: "body".to_string(),
            is_featured: false,
            visits,
            img: None,
            created,
            changed: created,
        }
    }

    #[test]
    fn empty_predicate_matches_everything() {
        let predicate = PostPredicate::all();
        assert!(predicate.is_unconstrained());

        let mut featured = post("Featured", "news", 0, 0);
        featured.is_featured = true;
        for p in [post("A", "general", 1, 5), post("b", "rust", -10, 0), featured] {
            assert!(predicate.matches(&p));
        }
    }

    #[test]
    fn title_match_is_case_insensitive_substring() {
        let predicate = PostPredicate {
            title_contains: Some("RuSt".to_string()),
            ..Default::default()
        };
        assert!(predicate.matches(&post("Learning rust today", "general", 0, 0)));
        assert!(!predicate.matches(&post("Learning Go", "general", 0, 0)));
    }

    #[test]
    fn empty_id_set_matches_nothing() {
        let predicate = PostPredicate {
            ids: Some(vec![]),
            ..Default::default()
        };
        assert!(!predicate.matches(&post("A", "general", 0, 0)));
    }

    #[test]
    fn created_since_keeps_tighter_bound() {
        let predicate = PostPredicate::all().created_since(100).created_since(50);
        assert_eq!(predicate.created_since, Some(100));
    }

    #[test]
    fn excluding_skips_duplicates() {
        let id = Uuid::now_v7();
        let predicate = PostPredicate::all().excluding([id, id]).excluding([id]);
        assert_eq!(predicate.exclude_ids, vec![id]);
    }

    #[test]
    fn order_breaks_ties_by_id() {
        let mut a = post("A", "general", 10, 3);
        let mut b = post("B", "general", 10, 3);
        a.id = Uuid::from_u128(1);
        b.id = Uuid::from_u128(2);

        assert_eq!(PostOrder::NEWEST.compare(&b, &a), Ordering::Less);
        let oldest = PostOrder {
            field: SortField::Created,
            direction: SortDirection::Asc,
        };
        assert_eq!(oldest.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn featured_flag_parsing() {
        assert!(is_truthy(Some("true")));
        assert!(is_truthy(Some("1")));
        assert!(is_truthy(Some("yes")));
        assert!(!is_truthy(Some("false")));
        assert!(!is_truthy(Some("0")));
        assert!(!is_truthy(Some("  ")));
        assert!(!is_truthy(None));
    }

    #[test]
    fn params_treat_blank_values_as_absent() {
        let params = FeedParams {
            cat: Some("  ".to_string()),
            search: Some(String::new()),
            author: Some(" alice ".to_string()),
            ..Default::default()
        };
        let filter = params.filter();
        assert_eq!(filter.category, None);
        assert_eq!(filter.search, None);
        assert_eq!(filter.author.as_deref(), Some("alice"));
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        assert_eq!(dedup_ids(&[a, b, a]), vec![a, b]);
    }
}
