//! HTTP route handlers.

pub mod comments;
pub mod health;
pub mod helpers;
pub mod posts;
pub mod users;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// All API routes behind the session authentication layer.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(posts::router())
        .merge(comments::router())
        .merge(users::router())
        .merge(webhooks::router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::authenticate_identity,
        ))
        .with_state(state)
}
