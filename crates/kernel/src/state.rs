//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::feed::FeedService;
use crate::middleware::TokenVerifier;
use crate::services::identity_webhook::WebhookVerifier;
use crate::services::media::MediaSigner;
use crate::store::{ContentStore, PgContentStore};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Content storage (PostgreSQL in production).
    store: Arc<dyn ContentStore>,

    /// Public and saved-posts feeds.
    feed: FeedService,

    /// Session token verifier (None when no key or secret is configured).
    token_verifier: Option<TokenVerifier>,

    /// Identity provider webhook verifier.
    webhook_verifier: Option<WebhookVerifier>,

    /// Media upload credential signer.
    media: Option<MediaSigner>,
}

impl AppState {
    /// Create the application state: connect, migrate, and build services.
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        db::run_migrations(&pool)
            .await
            .context("failed to run migrations")?;
        info!("database migrations applied");

        Self::from_store(config, Arc::new(PgContentStore::new(pool)))
    }

    /// Create the application state over an existing store.
    pub fn from_store(config: &Config, store: Arc<dyn ContentStore>) -> Result<Self> {
        let token_verifier = TokenVerifier::from_config(config)?;
        if token_verifier.is_none() {
            tracing::warn!("no session key configured; authenticated routes will reject callers");
        }

        let webhook_verifier = config
            .identity_webhook_secret
            .as_deref()
            .map(WebhookVerifier::new)
            .transpose()
            .context("invalid IDENTITY_WEBHOOK_SECRET")?;
        if webhook_verifier.is_none() {
            tracing::warn!("IDENTITY_WEBHOOK_SECRET not set; identity webhooks are disabled");
        }

        let media = MediaSigner::from_config(config);
        if media.is_none() {
            tracing::warn!("media keys not set; upload credentials are disabled");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                feed: FeedService::new(store.clone()),
                store,
                token_verifier,
                webhook_verifier,
                media,
            }),
        })
    }

    /// Get the content store.
    pub fn store(&self) -> &dyn ContentStore {
        self.inner.store.as_ref()
    }

    /// Get a shared handle to the content store.
    pub fn store_handle(&self) -> Arc<dyn ContentStore> {
        self.inner.store.clone()
    }

    /// Get the feed service.
    pub fn feed(&self) -> &FeedService {
        &self.inner.feed
    }

    /// Get the session token verifier (if configured).
    pub fn token_verifier(&self) -> Option<&TokenVerifier> {
        self.inner.token_verifier.as_ref()
    }

    /// Get the webhook verifier (if configured).
    pub fn webhook_verifier(&self) -> Option<&WebhookVerifier> {
        self.inner.webhook_verifier.as_ref()
    }

    /// Get the media signer (if configured).
    pub fn media(&self) -> Option<&MediaSigner> {
        self.inner.media.as_ref()
    }
}
