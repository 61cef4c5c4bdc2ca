//! Shared error handling for API endpoints.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// Extension trait for concise error mapping on Results.
pub trait ResultExt<T> {
    fn db_err(self, msg: &str) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn db_err(self, msg: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::db_error(msg, e))
    }
}

/// API error with a stable machine-readable code and a human-readable
/// message, converted into a JSON response.
pub enum ApiError {
    BadRequest(&'static str, String),
    Unauthorized(&'static str, String),
    NotFound(&'static str, String),
    Internal(&'static str, String),
}

impl ApiError {
    pub fn bad_request(code: &'static str, msg: impl Into<String>) -> Self {
        Self::BadRequest(code, msg.into())
    }

    pub fn unauthorized(code: &'static str, msg: impl Into<String>) -> Self {
        Self::Unauthorized(code, msg.into())
    }

    pub fn not_found(code: &'static str, msg: impl Into<String>) -> Self {
        Self::NotFound(code, msg.into())
    }

    pub fn internal(code: &'static str, msg: impl Into<String>) -> Self {
        Self::Internal(code, msg.into())
    }

    /// Log the underlying cause and hide it behind a generic 500.
    pub fn db_error(context: &str, e: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, e);
        Self::Internal("internal_server_error", "Internal Server Error".into())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(code, msg) => (StatusCode::BAD_REQUEST, code, msg),
            ApiError::Unauthorized(code, msg) => (StatusCode::UNAUTHORIZED, code, msg),
            ApiError::NotFound(code, msg) => (StatusCode::NOT_FOUND, code, msg),
            ApiError::Internal(code, msg) => (StatusCode::INTERNAL_SERVER_ERROR, code, msg),
        };
        (status, Json(ErrorResponse { code, message })).into_response()
    }
}
