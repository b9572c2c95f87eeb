#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Every test builds its own [`TestApp`]: the real router and state over a
//! fresh [`MemoryStore`], with session, webhook and media keys configured.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::Value;
use tower::ServiceExt;

use quire_kernel::config::Config;
use quire_kernel::middleware::identity::{SessionClaims, SessionMetadata};
use quire_kernel::models::{Post, User};
use quire_kernel::routes;
use quire_kernel::state::AppState;
use quire_kernel::store::MemoryStore;
use quire_test_utils::{TestPost, TestUser, webhook_secret};

pub const JWT_SECRET: &str = "integration-session-secret";
pub const WEBHOOK_KEY: &[u8] = b"integration-webhook-key";

/// Config pointing at no database; state is built over a memory store.
pub fn test_config() -> Config {
    Config {
        port: 0,
        database_url: "memory".to_string(),
        database_max_connections: 1,
        cors_allowed_origins: vec!["*".to_string()],
        identity_jwt_public_key: None,
        identity_jwt_secret: Some(JWT_SECRET.to_string()),
        identity_webhook_secret: Some(webhook_secret(WEBHOOK_KEY)),
        media_public_key: Some("public_test".to_string()),
        media_private_key: Some("private_test".to_string()),
        media_url_endpoint: Some("https://media.example".to_string()),
    }
}

/// Test application wrapper using the REAL kernel routes and state.
pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    pub fn with_store(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        let state = AppState::from_store(&test_config(), store.clone()).unwrap();
        Self {
            router: routes::app(state.clone()),
            store,
            state,
        }
    }

    /// Store a user fixture.
    pub fn user(&self, fixture: &TestUser) -> User {
        let user = User {
            id: fixture.id,
            external_id: fixture.external_id.clone(),
            username: fixture.username.clone(),
            email: fixture.email.clone(),
            img: None,
            saved_posts: fixture.saved_posts.clone(),
            created: 0,
        };
        self.store.put_user(user.clone());
        user
    }

    /// Store a post fixture.
    pub fn post(&self, fixture: &TestPost) -> Post {
        let post = Post {
            id: fixture.id,
            user_id: fixture.user_id,
            title: fixture.title.clone(),
            slug: fixture.slug.clone(),
            description: fixture.description.clone(),
            category: fixture.category.clone(),
            content: fixture.content.clone(),
            is_featured: fixture.is_featured,
            visits: fixture.visits,
            img: None,
            created: fixture.created,
            changed: fixture.created,
        };
        self.store.put_post(post.clone());
        post
    }

    /// Send a request and decode the JSON response.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.dispatch(request).await
    }

    /// Send a prepared request and decode the JSON response.
    pub async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }
}

/// A session token for the user, optionally with the admin role.
pub fn token_for(user: &TestUser, admin: bool) -> String {
    let claims = SessionClaims {
        sub: user.external_id.clone(),
        exp: quire_test_utils::now() + 3600,
        metadata: SessionMetadata {
            role: admin.then(|| "admin".to_string()),
        },
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

/// Titles of the posts in a feed response, in order.
pub fn titles(feed: &Value) -> Vec<String> {
    feed["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap().to_string())
        .collect()
}
