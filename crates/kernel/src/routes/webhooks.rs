//! Identity provider webhook endpoint.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use tracing::{debug, info};

use super::helpers::{MessageResponse, now};
use crate::error::{AppError, AppResult};
use crate::services::identity_webhook::WebhookEvent;
use crate::state::AppState;

async fn identity_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<MessageResponse>> {
    let verifier = state
        .webhook_verifier()
        .ok_or_else(|| AppError::Unavailable("identity webhooks are not configured".to_string()))?;

    match verifier.verify_event(&headers, &body, now())? {
        WebhookEvent::UserCreated(input) => {
            let user = state.store().provision_user(input).await?;
            info!(user_id = %user.id, username = %user.username, "user provisioned");
        }
        WebhookEvent::Other(kind) => {
            debug!(kind = %kind, "ignoring identity event");
        }
    }

    Ok(Json(MessageResponse::new("webhook received")))
}

/// Create the webhooks router.
pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks/identity", post(identity_webhook))
}
