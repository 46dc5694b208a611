//! Error types for the hub API.
//!
//! [`ApiError`] maps the service error taxonomy onto HTTP status codes via
//! its [`IntoResponse`](axum::response::IntoResponse) implementation. Every
//! error body has the shape `{"error": "...", "status": 404}`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use feedline_core::FeedError;
use tracing::error;

/// Errors that can occur in the hub API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing, malformed, or unknown bearer token.
    #[error("unauthorized")]
    Unauthorized,

    /// Malformed input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The referenced account does not exist or cannot be targeted.
    #[error("not found: {0}")]
    NotFound(String),

    /// A pagination key that cannot be resumed.
    #[error("unprocessable: {0}")]
    Unprocessable(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<FeedError> for ApiError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::Unauthorized => Self::Unauthorized,
            FeedError::BadRequest(msg) => Self::BadRequest(msg),
            FeedError::NotFound(msg) => Self::NotFound(msg),
            FeedError::UnprocessableEntity(msg) => Self::Unprocessable(msg),
            FeedError::Store(store) => {
                error!(error = %store, "store failure while serving request");
                Self::Internal("storage unavailable".to_owned())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::BadRequest(errors.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
