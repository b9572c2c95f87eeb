//! Signed upload credentials for the external media host.
//!
//! Clients upload images straight to the media host. The backend only hands
//! out a short-lived credential: a random token, an expiry, and
//! `hex(HMAC-SHA1(private_key, token || expire))`.

use anyhow::{Context, Result};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::Serialize;
use sha1::Sha1;

use crate::config::Config;

/// Lifetime of an upload credential.
pub const CREDENTIAL_TTL_SECS: i64 = 30 * 60;

type HmacSha1 = Hmac<Sha1>;

/// Credential returned to clients before an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCredential {
    pub token: String,
    pub expire: i64,
    pub signature: String,
    pub public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_endpoint: Option<String>,
}

/// Issues upload credentials for the media host.
#[derive(Clone)]
pub struct MediaSigner {
    public_key: String,
    private_key: String,
    url_endpoint: Option<String>,
}

impl std::fmt::Debug for MediaSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaSigner")
            .field("public_key", &self.public_key)
            .field("url_endpoint", &self.url_endpoint)
            .finish_non_exhaustive()
    }
}

impl MediaSigner {
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: private_key.into(),
            url_endpoint: None,
        }
    }

    /// Media host base URL echoed to clients with each credential.
    pub fn with_url_endpoint(mut self, url_endpoint: impl Into<String>) -> Self {
        self.url_endpoint = Some(url_endpoint.into());
        self
    }

    /// Build a signer when both media keys are configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        match (&config.media_public_key, &config.media_private_key) {
            (Some(public), Some(private)) => {
                let signer = Self::new(public.clone(), private.clone());
                Some(match &config.media_url_endpoint {
                    Some(endpoint) => signer.with_url_endpoint(endpoint.clone()),
                    None => signer,
                })
            }
            _ => None,
        }
    }

    /// Issue a fresh credential valid until `now + CREDENTIAL_TTL_SECS`.
    pub fn issue(&self, now: i64) -> Result<UploadCredential> {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        let expire = now + CREDENTIAL_TTL_SECS;
        let signature = self.sign(&token, expire)?;

        Ok(UploadCredential {
            token,
            expire,
            signature,
            public_key: self.public_key.clone(),
            url_endpoint: self.url_endpoint.clone(),
        })
    }

    /// Signature over `token` and `expire`.
    pub fn sign(&self, token: &str, expire: i64) -> Result<String> {
        let mut mac = HmacSha1::new_from_slice(self.private_key.as_bytes())
            .context("invalid media private key")?;
        mac.update(token.as_bytes());
        mac.update(expire.to_string().as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn credential_fields() {
        let signer = MediaSigner::new("public_abc", "private_xyz");
        let credential = signer.issue(1_700_000_000).unwrap();

        assert_eq!(credential.expire, 1_700_000_000 + CREDENTIAL_TTL_SECS);
        assert_eq!(credential.public_key, "public_abc");
        assert_eq!(credential.token.len(), 32);
        assert_eq!(credential.signature.len(), 40);
        assert_eq!(
            credential.signature,
            signer.sign(&credential.token, credential.expire).unwrap()
        );
    }

    #[test]
    fn tokens_are_fresh() {
        let signer = MediaSigner::new("pk", "sk");
        let a = signer.issue(0).unwrap();
        let b = signer.issue(0).unwrap();
        assert_ne!(a.token, b.token);
        assert_ne!(a.signature, b.signature);
    }

    #[test]
    fn signature_depends_on_key() {
        let a = MediaSigner::new("pk", "one").sign("token", 10).unwrap();
        let b = MediaSigner::new("pk", "two").sign("token", 10).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn serializes_with_public_key_in_camel_case() {
        let credential = UploadCredential {
            token: "t".to_string(),
            expire: 1,
            signature: "s".to_string(),
            public_key: "pk".to_string(),
            url_endpoint: None,
        };
        let json = serde_json::to_value(&credential).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"token": "t", "expire": 1, "signature": "s", "publicKey": "pk"})
        );

        let with_endpoint = UploadCredential {
            url_endpoint: Some("https://media.example".to_string()),
            ..credential
        };
        let json = serde_json::to_value(&with_endpoint).unwrap();
        assert_eq!(json["urlEndpoint"], "https://media.example");
    }

    #[test]
    fn debug_hides_private_key() {
        let signer = MediaSigner::new("pk", "very-secret");
        assert!(!format!("{signer:?}").contains("very-secret"));
    }
}
