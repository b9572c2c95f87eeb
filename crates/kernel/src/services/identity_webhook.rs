//! Identity provider webhook verification.
//!
//! The identity provider signs deliveries the Svix way:
//! - `svix-id`: message id
//! - `svix-timestamp`: unix seconds
//! - `svix-signature`: space-separated `v1,<base64>` entries
//!
//! Each signature is `base64(HMAC-SHA256(key, "{id}.{timestamp}.{body}"))`
//! where the key is the base64 part of the `whsec_...` secret.

use axum::http::HeaderMap;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::error::AppError;
use crate::models::CreateUser;

/// Maximum clock skew accepted between the provider and this server.
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 5 * 60;

const SECRET_PREFIX: &str = "whsec_";

type HmacSha256 = Hmac<Sha256>;

/// Webhook verification and decoding failures.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid webhook secret")]
    InvalidSecret,

    #[error("missing header: {0}")]
    MissingHeader(&'static str),

    #[error("invalid timestamp")]
    InvalidTimestamp,

    #[error("timestamp outside tolerance")]
    TimestampOutOfTolerance,

    #[error("no matching signature")]
    InvalidSignature,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::InvalidSecret => {
                AppError::Unavailable("webhook verification is not configured".to_string())
            }
            other => AppError::InvalidArgument(format!("webhook verification failed: {other}")),
        }
    }
}

/// A verified identity provider event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    /// A new account; provision a local user.
    UserCreated(CreateUser),
    /// Any other event type, acknowledged and ignored.
    Other(String),
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Deserialize)]
struct UserData {
    id: String,
    username: Option<String>,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
    image_url: Option<String>,
}

#[derive(Deserialize)]
struct EmailAddress {
    email_address: String,
}

/// Verifies signed deliveries from the identity provider.
#[derive(Clone)]
pub struct WebhookVerifier {
    key: Vec<u8>,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier").finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    /// Build a verifier from a `whsec_`-prefixed (or bare) base64 secret.
    pub fn new(secret: &str) -> Result<Self, WebhookError> {
        let encoded = secret.trim();
        let encoded = encoded.strip_prefix(SECRET_PREFIX).unwrap_or(encoded);
        let key = STANDARD
            .decode(encoded)
            .map_err(|_| WebhookError::InvalidSecret)?;
        if key.is_empty() {
            return Err(WebhookError::InvalidSecret);
        }
        Ok(Self { key })
    }

    /// Verify the signature headers against the raw body.
    pub fn verify(&self, headers: &HeaderMap, body: &[u8], now: i64) -> Result<(), WebhookError> {
        let id = header(headers, "svix-id")?;
        let timestamp = header(headers, "svix-timestamp")?;
        let signatures = header(headers, "svix-signature")?;

        let sent: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| WebhookError::InvalidTimestamp)?;
        if now.abs_diff(sent) > TIMESTAMP_TOLERANCE_SECS.unsigned_abs() {
            return Err(WebhookError::TimestampOutOfTolerance);
        }

        let expected = self.sign(id, timestamp, body)?;
        let matched = signatures
            .split_whitespace()
            .filter_map(|entry| entry.strip_prefix("v1,"))
            .any(|candidate| bool::from(candidate.as_bytes().ct_eq(expected.as_bytes())));

        if matched {
            Ok(())
        } else {
            Err(WebhookError::InvalidSignature)
        }
    }

    /// Base64 signature for a message.
    pub fn sign(&self, id: &str, timestamp: &str, body: &[u8]) -> Result<String, WebhookError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).map_err(|_| WebhookError::InvalidSecret)?;
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Verify and decode a delivery.
    pub fn verify_event(
        &self,
        headers: &HeaderMap,
        body: &[u8],
        now: i64,
    ) -> Result<WebhookEvent, WebhookError> {
        self.verify(headers, body, now)?;
        parse_event(body)
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingHeader(name))
}

/// Decode an already verified body.
pub fn parse_event(body: &[u8]) -> Result<WebhookEvent, WebhookError> {
    let raw: RawEvent =
        serde_json::from_slice(body).map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

    if raw.kind != "user.created" {
        return Ok(WebhookEvent::Other(raw.kind));
    }

    let data: UserData = serde_json::from_value(raw.data)
        .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;
    let email = data
        .email_addresses
        .into_iter()
        .next()
        .map(|e| e.email_address)
        .ok_or_else(|| WebhookError::InvalidPayload("user has no email address".to_string()))?;
    let username = data
        .username
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| email.clone());

    Ok(WebhookEvent::UserCreated(CreateUser {
        external_id: data.id,
        username,
        email,
        img: data.image_url,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    const SECRET: &str = "whsec_c2VjcmV0LWtleS1mb3ItdGVzdHM=";

    fn signed_headers(verifier: &WebhookVerifier, body: &[u8], ts: i64) -> HeaderMap {
        let ts = ts.to_string();
        let signature = verifier.sign("msg_1", &ts, body).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("svix-id", HeaderValue::from_static("msg_1"));
        headers.insert("svix-timestamp", HeaderValue::from_str(&ts).unwrap());
        headers.insert(
            "svix-signature",
            HeaderValue::from_str(&format!("v1,bogus v1,{signature}")).unwrap(),
        );
        headers
    }

    fn user_created(username: Option<&str>) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "type": "user.created",
            "data": {
                "id": "user_2abc",
                "username": username,
                "email_addresses": [{"email_address": "alice@example.com"}],
                "image_url": "https://img.example/alice.png"
            }
        }))
        .unwrap()
    }

    #[test]
    fn secret_prefix_is_optional() {
        assert!(WebhookVerifier::new(SECRET).is_ok());
        assert!(WebhookVerifier::new("c2VjcmV0LWtleS1mb3ItdGVzdHM=").is_ok());
        assert!(matches!(
            WebhookVerifier::new("whsec_***"),
            Err(WebhookError::InvalidSecret)
        ));
    }

    #[test]
    fn valid_delivery_decodes_user() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let body = user_created(Some("alice"));
        let headers = signed_headers(&verifier, &body, 1_000);

        let event = verifier.verify_event(&headers, &body, 1_010).unwrap();
        assert_eq!(
            event,
            WebhookEvent::UserCreated(CreateUser {
                external_id: "user_2abc".to_string(),
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                img: Some("https://img.example/alice.png".to_string()),
            })
        );
    }

    #[test]
    fn username_falls_back_to_email() {
        let event = parse_event(&user_created(None)).unwrap();
        let WebhookEvent::UserCreated(user) = event else {
            panic!("expected user.created");
        };
        assert_eq!(user.username, "alice@example.com");
    }

    #[test]
    fn tampered_body_is_rejected() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let body = user_created(Some("alice"));
        let headers = signed_headers(&verifier, &body, 1_000);

        let err = verifier
            .verify(&headers, &user_created(Some("mallory")), 1_000)
            .unwrap_err();
        assert!(matches!(err, WebhookError::InvalidSignature));
    }

    #[test]
    fn stale_delivery_is_rejected() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let body = user_created(Some("alice"));
        let headers = signed_headers(&verifier, &body, 1_000);

        let err = verifier
            .verify(&headers, &body, 1_000 + TIMESTAMP_TOLERANCE_SECS + 1)
            .unwrap_err();
        assert!(matches!(err, WebhookError::TimestampOutOfTolerance));
    }

    #[test]
    fn extreme_timestamps_are_out_of_tolerance() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();

        for ts in [i64::MIN, i64::MAX] {
            let mut headers = HeaderMap::new();
            headers.insert("svix-id", HeaderValue::from_static("msg_1"));
            headers.insert("svix-timestamp", HeaderValue::from_str(&ts.to_string()).unwrap());
            headers.insert("svix-signature", HeaderValue::from_static("v1,bogus"));

            for now in [1_700_000_000, i64::MIN, i64::MAX] {
                if now == ts {
                    continue;
                }
                let err = verifier.verify(&headers, b"{}", now).unwrap_err();
                assert!(
                    matches!(err, WebhookError::TimestampOutOfTolerance),
                    "ts={ts} now={now}: {err:?}"
                );
            }
        }
    }

    #[test]
    fn missing_headers_are_reported() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let err = verifier.verify(&HeaderMap::new(), b"{}", 0).unwrap_err();
        assert!(matches!(err, WebhookError::MissingHeader("svix-id")));
        assert!(matches!(AppError::from(err), AppError::InvalidArgument(_)));
    }

    #[test]
    fn other_events_are_passed_through() {
        let event = parse_event(br#"{"type":"session.created","data":{}}"#).unwrap();
        assert_eq!(event, WebhookEvent::Other("session.created".to_string()));
    }
}
