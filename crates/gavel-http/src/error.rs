//! Error types for the judge HTTP surface.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

use gavel_core::JudgeError;

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    /// Malformed body or a request the judge refused to run
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The sandbox could not execute the submission
    #[error("Sandbox unavailable: {0}")]
    SandboxUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn sandbox_unavailable(msg: impl Into<String>) -> Self {
        Self::SandboxUnavailable(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_) => 400,
            ServerError::PayloadTooLarge(_) => 413,
            ServerError::NotFound(_) => 404,
            ServerError::SandboxUnavailable(_) => 503,
            ServerError::Io(_) | ServerError::Config(_) | ServerError::Internal(_) => 500,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ServerError::InvalidRequest(_) => "invalid_request",
            ServerError::PayloadTooLarge(_) => "payload_too_large",
            ServerError::NotFound(_) => "not_found",
            ServerError::SandboxUnavailable(_) => "sandbox_unavailable",
            ServerError::Io(_) => "io_error",
            ServerError::Config(_) => "config_error",
            ServerError::Internal(_) => "internal_error",
        }
    }

    /// Short human-facing summary placed in the `error` field.
    fn summary(&self) -> &'static str {
        match self {
            ServerError::InvalidRequest(_) => "Invalid request",
            ServerError::PayloadTooLarge(_) => "Request body too large",
            ServerError::NotFound(_) => "Not found",
            ServerError::SandboxUnavailable(_) => "Code execution is unavailable",
            ServerError::Io(_) | ServerError::Config(_) | ServerError::Internal(_) => {
                "Internal server error"
            }
        }
    }

    fn details(&self) -> String {
        match self {
            ServerError::InvalidRequest(msg)
            | ServerError::PayloadTooLarge(msg)
            | ServerError::NotFound(msg)
            | ServerError::SandboxUnavailable(msg)
            | ServerError::Config(msg)
            | ServerError::Internal(msg) => msg.clone(),
            ServerError::Io(e) => e.to_string(),
        }
    }
}

impl From<JudgeError> for ServerError {
    fn from(err: JudgeError) -> Self {
        match err {
            JudgeError::Validation(msg) => ServerError::InvalidRequest(msg),
            JudgeError::NotFound(msg) => ServerError::NotFound(msg),
            JudgeError::Config(msg) => ServerError::Config(msg),
            JudgeError::Io(msg) => ServerError::Internal(msg),
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::PayloadTooLarge(rejection.body_text())
        } else {
            ServerError::InvalidRequest(rejection.body_text())
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            log::error!("{} ({})", self, self.error_type());
        } else {
            log::warn!("{} ({})", self, self.error_type());
        }

        (
            status,
            Json(json!({
                "error": self.summary(),
                "details": self.details(),
                "timestamp": chrono::Utc::now()
            })),
        )
            .into_response()
    }
}
