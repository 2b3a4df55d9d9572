//! Error types for the playground server.
//!
//! These cover the HTTP surface only. Outcomes of a submission, including
//! tooling faults, are `CompileResult` values and never pass through here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors that can occur in the playground server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid request format
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Server configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Create a new invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a new missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    /// Create a new configuration error.
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) | ServerError::MissingField(_) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::Io(_) | ServerError::Config(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ServerError::Io(_) => "io_error",
            ServerError::InvalidRequest(_) => "invalid_request",
            ServerError::MissingField(_) => "invalid_request",
            ServerError::Config(_) => "config_error",
            ServerError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Internal details stay in the log; callers get a generic message.
        let details = if status.is_server_error() {
            log::error!("Request failed: {}", self);
            "The playground hit an unexpected internal error".to_string()
        } else {
            self.to_string()
        };

        (
            status,
            Json(json!({
                "error": self.error_type(),
                "details": details,
                "timestamp": chrono::Utc::now()
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_bad_requests() {
        assert_eq!(
            ServerError::missing_field("code").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::invalid_request("not json").error_type(),
            "invalid_request"
        );
        assert_eq!(
            ServerError::internal("join failed").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
