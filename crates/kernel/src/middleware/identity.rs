//! Identity provider session authentication.
//!
//! Checks `Authorization: Bearer <token>` headers, verifies the session JWT
//! issued by the identity provider, and stores the resulting [`Identity`] in
//! request extensions. Handlers that need a caller take `Identity` as an
//! extractor; it rejects with 401 when the middleware found no valid token.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::AppError;
use crate::state::AppState;

/// Claims read from an identity provider session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Identity provider user key.
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub metadata: SessionMetadata,
}

/// Custom session claims configured on the identity provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub role: Option<String>,
}

/// Caller role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// Only an explicit `"admin"` role grants admin rights.
    pub fn from_claims(claims: &SessionClaims) -> Self {
        match claims.metadata.role.as_deref() {
            Some("admin") => Role::Admin,
            _ => Role::User,
        }
    }
}

/// A verified caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Identity provider user key, matched against `users.external_id`.
    pub external_id: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(AppError::Unauthenticated)
    }
}

/// Verifies identity provider session tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Verify RS256 tokens against the provider's PEM public key.
    pub fn rs256(public_key_pem: &str) -> Result<Self> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .context("invalid identity provider public key")?;
        Ok(Self::with_key(decoding_key, Algorithm::RS256))
    }

    /// Verify HS256 tokens signed with a shared secret.
    pub fn hs256(secret: &[u8]) -> Self {
        Self::with_key(DecodingKey::from_secret(secret), Algorithm::HS256)
    }

    fn with_key(decoding_key: DecodingKey, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_aud = false;
        Self {
            decoding_key,
            validation,
        }
    }

    /// Build from config. The public key wins when both are set; `None` when
    /// neither is.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        if let Some(ref pem) = config.identity_jwt_public_key {
            return Self::rs256(pem).map(Some);
        }
        Ok(config
            .identity_jwt_secret
            .as_deref()
            .map(|secret| Self::hs256(secret.as_bytes())))
    }

    /// Verify a token and return its claims.
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .context("invalid session token")?;
        Ok(data.claims)
    }

    /// Verify a token and return the caller it identifies.
    pub fn identify(&self, token: &str) -> Result<Identity> {
        let claims = self.verify(token)?;
        Ok(Identity {
            role: Role::from_claims(&claims),
            external_id: claims.sub,
        })
    }
}

/// Middleware to authenticate identity provider session tokens.
///
/// If a valid Bearer token is present, sets the [`Identity`] in request
/// extensions. If no token is present, passes through without modification.
/// If an invalid token is present, returns 401.
pub async fn authenticate_identity(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    let Some(token) = token else {
        return next.run(request).await;
    };

    let Some(verifier) = state.token_verifier() else {
        debug!("bearer token presented but no session verifier is configured");
        return AppError::Unauthenticated.into_response();
    };

    let identity = match verifier.identify(token) {
        Ok(identity) => identity,
        Err(e) => {
            debug!(error = %e, "invalid session token");
            return AppError::Unauthenticated.into_response();
        }
    };

    request.extensions_mut().insert(identity);

    next.run(request).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header};

    use super::*;

    const SECRET: &[u8] = b"test-session-secret";

    fn token(role: Option<&str>, exp: i64) -> String {
        let claims = SessionClaims {
            sub: "user_2abc".to_string(),
            exp,
            metadata: SessionMetadata {
                role: role.map(str::to_string),
            },
        };
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    fn future() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn valid_token_identifies_caller() {
        let verifier = TokenVerifier::hs256(SECRET);
        let identity = verifier.identify(&token(None, future())).unwrap();
        assert_eq!(identity.external_id, "user_2abc");
        assert_eq!(identity.role, Role::User);
        assert!(!identity.is_admin());
    }

    #[test]
    fn admin_role_comes_from_metadata() {
        let verifier = TokenVerifier::hs256(SECRET);
        let identity = verifier.identify(&token(Some("admin"), future())).unwrap();
        assert!(identity.is_admin());

        let identity = verifier.identify(&token(Some("editor"), future())).unwrap();
        assert_eq!(identity.role, Role::User);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let verifier = TokenVerifier::hs256(b"another-secret");
        assert!(verifier.verify(&token(None, future())).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let verifier = TokenVerifier::hs256(SECRET);
        let expired = chrono::Utc::now().timestamp() - 3600;
        assert!(verifier.verify(&token(None, expired)).is_err());
    }
}
