//! Shared route helpers.

use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::Identity;
use crate::models::User;
use crate::state::AppState;

/// Plain acknowledgement body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Load the local user for a verified identity.
///
/// A verified caller with no local record (the provisioning webhook has not
/// arrived yet) is `NotFound`.
pub async fn require_user(state: &AppState, identity: &Identity) -> AppResult<User> {
    state
        .store()
        .find_user_by_external_id(&identity.external_id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))
}

/// Parse an id from a path segment or request body.
pub fn parse_id(raw: &str, what: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::invalid(format!("{what} is not a valid id")))
}

/// Current time in unix seconds.
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
