//! Quire test utilities.
//!
//! Helpers for integration testing: post and user fixtures, clock helpers,
//! webhook signing, and assertion utilities.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

/// Seconds in a day.
pub const DAY: i64 = 24 * 60 * 60;

/// Unix timestamp `days` days before `now`.
pub fn days_ago(now: i64, days: i64) -> i64 {
    now - days * DAY
}

/// Current unix timestamp.
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Create a test post with default values.
pub fn test_post(title: &str) -> TestPost {
    let created = now();
    TestPost {
        id: Uuid::now_v7(),
        user_id: Uuid::nil(),
        title: title.to_string(),
        slug: title.to_lowercase().replace(' ', "-"),
        description: None,
        category: "general".to_string(),
        content: format!("Body of {title}"),
        is_featured: false,
        visits: 0,
        created,
    }
}

/// A test post builder for creating fixtures.
#[derive(Debug, Clone)]
pub struct TestPost {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub category: String,
    pub content: String,
    pub is_featured: bool,
    pub visits: i64,
    pub created: i64,
}

impl TestPost {
    /// Set a custom ID.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Set the owner.
    pub fn by(mut self, user_id: Uuid) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn in_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn with_slug(mut self, slug: &str) -> Self {
        self.slug = slug.to_string();
        self
    }

    /// Set as featured.
    pub fn featured(mut self) -> Self {
        self.is_featured = true;
        self
    }

    pub fn with_visits(mut self, visits: i64) -> Self {
        self.visits = visits;
        self
    }

    /// Set the creation time.
    pub fn created_at(mut self, created: i64) -> Self {
        self.created = created;
        self
    }
}

/// Create a test user with default values.
pub fn test_user(username: &str) -> TestUser {
    TestUser {
        id: Uuid::now_v7(),
        external_id: format!("user_{username}"),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        saved_posts: Vec::new(),
    }
}

/// A test user builder.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub external_id: String,
    pub username: String,
    pub email: String,
    pub saved_posts: Vec<Uuid>,
}

impl TestUser {
    /// Set a custom ID.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Add saved posts.
    pub fn saving(mut self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.saved_posts.extend(ids);
        self
    }
}

/// Sign a webhook delivery the way the identity provider does.
///
/// `key` is the raw (already base64-decoded) signing key. Returns the value
/// for the `svix-signature` header.
pub fn sign_webhook(key: &[u8], id: &str, timestamp: i64, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).unwrap_or_else(|_| unreachable!());
    mac.update(format!("{id}.{timestamp}.").as_bytes());
    mac.update(body);
    format!("v1,{}", STANDARD.encode(mac.finalize().into_bytes()))
}

/// Build a `whsec_` secret from a raw key.
pub fn webhook_secret(key: &[u8]) -> String {
    format!("whsec_{}", STANDARD.encode(key))
}

/// Assertion helpers for JSON responses.
pub mod assert {
    use std::collections::HashSet;

    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{key}', got: {value}"
        );
    }

    /// Assert that a JSON error envelope carries the given kind.
    pub fn error_kind(value: &Value, kind: &str) {
        assert_eq!(
            value.get("error").and_then(Value::as_str),
            Some(kind),
            "Expected error kind '{kind}', got: {value}"
        );
    }

    /// Collect the `id` field of every element of a JSON array.
    pub fn ids(value: &Value) -> Vec<String> {
        value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("id").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Assert that no id appears twice in a JSON array.
    pub fn unique_ids(value: &Value) {
        let ids = ids(value);
        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len(), "Duplicate ids in: {value}");
    }

    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{needle}'\nActual: {haystack}"
        );
    }
}
