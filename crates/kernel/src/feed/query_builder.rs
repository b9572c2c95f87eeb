//! Feed query builder using SeaQuery.
//!
//! Renders a [`PostPredicate`] into PostgreSQL for the three feed shapes:
//! - a windowed page under a [`PostOrder`]
//! - a count of all matches
//! - a random sample
//!
//! Every shape joins the owner so that posts without a resolvable owner are
//! excluded consistently from pages, counts, and samples.

use sea_query::{Alias, Asterisk, Cond, Expr, Order, PostgresQueryBuilder, Query, SelectStatement};

use super::types::{PostOrder, PostPredicate, SortDirection};

const POST: &str = "post";
const USERS: &str = "users";

/// Query builder for feed queries.
pub struct FeedQueryBuilder<'a> {
    predicate: &'a PostPredicate,
}

impl<'a> FeedQueryBuilder<'a> {
    pub fn new(predicate: &'a PostPredicate) -> Self {
        Self { predicate }
    }

    /// Build the page query.
    pub fn build_page(&self, order: &PostOrder, offset: u64, limit: u64) -> String {
        let mut query = self.select_with_author();

        let direction = match order.direction {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        };
        query.order_by(
            (Alias::new(POST), Alias::new(order.field.column())),
            direction.clone(),
        );
        // Tiebreaker keeps paging deterministic
        query.order_by((Alias::new(POST), Alias::new("id")), direction);

        query.limit(limit);
        query.offset(offset.min(i64::MAX as u64));

        query.to_string(PostgresQueryBuilder)
    }

    /// Build a COUNT query over the same predicate as [`Self::build_page`].
    pub fn build_count(&self) -> String {
        let mut query = Query::select();

        query.expr(Expr::col(Asterisk).count());
        query.from(Alias::new(POST));
        Self::join_owner(&mut query);
        query.cond_where(self.condition());

        query.to_string(PostgresQueryBuilder)
    }

    /// Build a random sample of up to `size` matches.
    pub fn build_sample(&self, size: u64) -> String {
        let mut query = self.select_with_author();

        query.order_by_expr(Expr::cust("RANDOM()"), Order::Asc);
        query.limit(size);

        query.to_string(PostgresQueryBuilder)
    }

    /// SELECT post.*, owner username and image, filtered by the predicate.
    fn select_with_author(&self) -> SelectStatement {
        let mut query = Query::select();

        query.column((Alias::new(POST), Asterisk));
        query.expr_as(
            Expr::col((Alias::new(USERS), Alias::new("username"))),
            Alias::new("author_username"),
        );
        query.expr_as(
            Expr::col((Alias::new(USERS), Alias::new("img"))),
            Alias::new("author_img"),
        );
        query.from(Alias::new(POST));
        Self::join_owner(&mut query);
        query.cond_where(self.condition());

        query
    }

    fn join_owner(query: &mut SelectStatement) {
        query.inner_join(
            Alias::new(USERS),
            Expr::col((Alias::new(POST), Alias::new("user_id")))
                .equals((Alias::new(USERS), Alias::new("id"))),
        );
    }

    /// AND of every constraint present in the predicate.
    fn condition(&self) -> Cond {
        let p = self.predicate;
        let mut cond = Cond::all();

        if let Some(ref category) = p.category {
            cond = cond.add(post_col("category").eq(category.as_str()));
        }

        if let Some(ref needle) = p.title_contains {
            let pattern = format!("%{}%", escape_like_wildcards(needle));
            cond = cond.add(Expr::cust_with_values(
                format!("\"{POST}\".\"title\" ILIKE $1"),
                [pattern],
            ));
        }

        if let Some(user_id) = p.user_id {
            cond = cond.add(post_col("user_id").eq(user_id));
        }

        if let Some(ref ids) = p.ids {
            cond = cond.add(if ids.is_empty() {
                // Empty membership set restricts rather than widens
                Expr::cust("FALSE")
            } else {
                post_col("id").is_in(ids.iter().copied())
            });
        }

        if !p.exclude_ids.is_empty() {
            cond = cond.add(post_col("id").is_not_in(p.exclude_ids.iter().copied()));
        }

        if p.featured_only {
            cond = cond.add(post_col("is_featured").eq(true));
        }

        if let Some(since) = p.created_since {
            cond = cond.add(post_col("created").gte(since));
        }

        cond
    }
}

fn post_col(column: &str) -> Expr {
    Expr::col((Alias::new(POST), Alias::new(column)))
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
