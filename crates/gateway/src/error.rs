//! Unified error handling for the gateway API.
//!
//! Handlers return `ApiResult<T>` and use `?`; every failure turns into a JSON body
//! with an `error` field. Backend failures are logged, never sent to the client.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::backend::BackendError;

/// Shown whenever the backend is unreachable or answers with something unreadable.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again later.";

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Unified error type for API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Backend unreachable, timed out, or replied with an unusable body
    #[error("{0}")]
    Backend(#[from] BackendError),

    /// Backend replied with a non-success status; relayed as-is
    #[error("Backend returned {status}: {message}")]
    Upstream { status: StatusCode, message: String },

    /// Invalid request data
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Request body could not be parsed as the expected JSON
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// No usable session cookie
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match &self {
            ApiError::Backend(e) => {
                tracing::error!("Backend error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    GENERIC_ERROR_MESSAGE.to_string(),
                    None,
                )
            }
            ApiError::Upstream { status, message } => {
                tracing::info!("Backend rejected request with {}: {}", status, message);
                (*status, message.clone(), None)
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            ApiError::InvalidBody(msg) => (
                StatusCode::BAD_REQUEST,
                "Invalid request body".to_string(),
                Some(msg.clone()),
            ),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
