//! Domain-specific error types for car-match

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Main error type for the car-match service
#[derive(Error, Debug)]
pub enum CarMatchError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error ({code}): {message}")]
    Validation { code: String, message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Service unavailable: {message}")]
    Unavailable { message: String },

    #[error("Upstream {service} error: {message}")]
    Upstream { service: String, message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CarMatchError {
    pub fn validation(code: &str, message: impl Into<String>) -> Self {
        CarMatchError::Validation {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn upstream(service: &str, message: impl Into<String>) -> Self {
        CarMatchError::Upstream {
            service: service.to_string(),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CarMatchError::Validation { .. } => StatusCode::BAD_REQUEST,
            CarMatchError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            CarMatchError::Forbidden { .. } => StatusCode::FORBIDDEN,
            CarMatchError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            CarMatchError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            CarMatchError::Config { .. }
            | CarMatchError::Serialization { .. }
            | CarMatchError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code placed in the `error` field of responses
    pub fn code(&self) -> &str {
        match self {
            CarMatchError::Config { .. } => "config_error",
            CarMatchError::Validation { code, .. } => code,
            CarMatchError::Unauthorized { .. } => "unauthorized",
            CarMatchError::Forbidden { .. } => "forbidden",
            CarMatchError::Unavailable { .. } => "unavailable",
            CarMatchError::Upstream { .. } => "upstream_error",
            CarMatchError::Serialization { .. } => "serialization_error",
            CarMatchError::Internal { .. } => "internal_error",
        }
    }

    fn detail(&self) -> String {
        match self {
            CarMatchError::Config { message }
            | CarMatchError::Validation { message, .. }
            | CarMatchError::Unauthorized { message }
            | CarMatchError::Forbidden { message }
            | CarMatchError::Unavailable { message }
            | CarMatchError::Serialization { message }
            | CarMatchError::Internal { message } => message.clone(),
            CarMatchError::Upstream { service, message } => format!("{service}: {message}"),
        }
    }
}

impl From<anyhow::Error> for CarMatchError {
    fn from(err: anyhow::Error) -> Self {
        CarMatchError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CarMatchError {
    fn from(err: serde_json::Error) -> Self {
        CarMatchError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for CarMatchError {
    fn from(err: reqwest::Error) -> Self {
        CarMatchError::Upstream {
            service: "http".to_string(),
            message: format!("HTTP request failed: {}", err),
        }
    }
}

impl From<csv::Error> for CarMatchError {
    fn from(err: csv::Error) -> Self {
        CarMatchError::Serialization {
            message: format!("CSV error: {}", err),
        }
    }
}

/// Convert CarMatchError to an `{error, detail}` JSON response
impl IntoResponse for CarMatchError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = json!({ "error": self.code(), "detail": self.detail() });
        (status, Json(body)).into_response()
    }
}

/// Result type alias for car-match operations
pub type Result<T> = std::result::Result<T, CarMatchError>;
