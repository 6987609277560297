//! Host error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use operations_messaging::{DeclarationError, MessagingError};
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the host.
#[derive(Debug, Error)]
pub enum AppError {
    /// A configuration variable is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// An event declaration failed validation at startup.
    #[error("declaration error: {0}")]
    Declaration(#[from] DeclarationError),

    /// Handlers could not be registered or subscribed.
    #[error("messaging error: {0}")]
    Messaging(#[from] MessagingError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// Errors returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No service with this name runs in the host.
    #[error("unknown service: {0}")]
    UnknownService(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            Self::UnknownService(_) => (StatusCode::NOT_FOUND, "service_not_found"),
        };

        let body = ErrorBody {
            error: error_code,
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
