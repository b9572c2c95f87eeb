//! Application error types.
//!
//! Every failure that reaches a handler is rendered as the same JSON
//! envelope: `{"error": "<kind>", "message": "<text>"}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("store failure")]
    Store(#[from] anyhow::Error),
}

/// Wire shape of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl AppError {
    /// Stable machine-readable kind for the error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "unauthenticated",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidArgument(_) => "invalid_argument",
            AppError::Conflict(_) => "conflict",
            AppError::Unavailable(_) => "unavailable",
            AppError::Store(_) => "store_failure",
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::InvalidArgument(message.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Store details go to the log, never to the client
        let message = match &self {
            AppError::Store(e) => {
                tracing::error!(error = ?e, "store failure");
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = ErrorBody {
            error: self.kind(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_and_statuses_line_up() {
        let cases = [
            (AppError::Unauthenticated, "unauthenticated", 401),
            (AppError::forbidden("no"), "forbidden", 403),
            (AppError::not_found("gone"), "not_found", 404),
            (AppError::invalid("bad id"), "invalid_argument", 400),
            (AppError::Conflict("slug".into()), "conflict", 409),
            (AppError::Unavailable("media".into()), "unavailable", 503),
            (
                AppError::Store(anyhow::anyhow!("connection reset")),
                "store_failure",
                500,
            ),
        ];

        for (err, kind, status) in cases {
            assert_eq!(err.kind(), kind);
            assert_eq!(err.status().as_u16(), status);
        }
    }

    #[test]
    fn store_failure_hides_details() {
        let response = AppError::Store(anyhow::anyhow!("password=hunter2")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn sqlx_errors_surface_as_store_failures() {
        let err = AppError::from(anyhow::Error::from(sqlx::Error::PoolTimedOut));
        assert!(matches!(err, AppError::Store(_)));
        assert_eq!(err.kind(), "store_failure");
        assert_eq!(err.to_string(), "store failure");
    }

    #[test]
    fn client_errors_keep_their_message() {
        assert_eq!(
            AppError::invalid("currentPostId is not a valid id").to_string(),
            "currentPostId is not a valid id"
        );
    }
}
