//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,

    /// PEM-encoded RSA public key used to verify identity provider session tokens.
    pub identity_jwt_public_key: Option<String>,

    /// Shared secret for HS256 session tokens (used when no public key is set).
    pub identity_jwt_secret: Option<String>,

    /// Signing secret for identity provider webhooks (`whsec_...`).
    pub identity_webhook_secret: Option<String>,

    /// Public key handed to clients alongside media upload credentials.
    pub media_public_key: Option<String>,

    /// Private key used to sign media upload credentials.
    pub media_private_key: Option<String>,

    /// Base URL of the media host.
    pub media_url_endpoint: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| parse_list(&v))
            .unwrap_or_else(|_| vec!["*".to_string()]);

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            cors_allowed_origins,
            identity_jwt_public_key: optional_var("IDENTITY_JWT_PUBLIC_KEY"),
            identity_jwt_secret: optional_var("IDENTITY_JWT_SECRET"),
            identity_webhook_secret: optional_var("IDENTITY_WEBHOOK_SECRET"),
            media_public_key: optional_var("MEDIA_PUBLIC_KEY"),
            media_private_key: optional_var("MEDIA_PRIVATE_KEY"),
            media_url_endpoint: optional_var("MEDIA_URL_ENDPOINT"),
        })
    }
}

/// Read an environment variable, treating empty values as unset.
fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Split a comma-separated list, dropping blank entries.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
