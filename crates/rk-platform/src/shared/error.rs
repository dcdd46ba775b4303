//! Platform Error Types

use thiserror::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response, Json},
};
use utoipa::ToSchema;

/// Message used whenever a required input is missing or blank.
pub const BAD_ARGUMENTS: &str = "Bad arguments.";

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("{message}")]
    BadRequest { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Conflict { message: String },

    /// Unique index violation reported by the store itself. Deliberately
    /// left unclassified, so it renders as a 500.
    #[error("Duplicate key on {field}: {value}")]
    DuplicateKey { field: String, value: String },

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

impl PlatformError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into() }
    }

    pub fn bad_arguments() -> Self {
        Self::bad_request(BAD_ARGUMENTS)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict { message: message.into() }
    }

    pub fn duplicate_key(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::DuplicateKey {
            field: field.into(),
            value: value.into(),
        }
    }

    /// HTTP status for this error. Anything not explicitly classified is a 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            PlatformError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            PlatformError::NotFound { .. } => StatusCode::NOT_FOUND,
            PlatformError::Conflict { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            PlatformError::BadRequest { .. } => "BAD_REQUEST",
            PlatformError::NotFound { .. } => "NOT_FOUND",
            PlatformError::Conflict { .. } => "CONFLICT",
            _ => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Error response body
#[derive(Debug, serde::Serialize, serde::Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for PlatformError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = ErrorResponse {
            error: self.error_type().to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
