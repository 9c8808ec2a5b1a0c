//! # Error Handling
//!
//! This module defines the application-wide error taxonomy and handles
//! converting errors into HTTP responses.
//!
//! The taxonomy has four tiers:
//! - configuration errors (template cache defects) abort startup
//! - client errors (CSRF mismatch, bad form input) surface as 4xx with a
//!   human-readable, non-sensitive message
//! - not-found errors surface as a plain 404
//! - server errors (store failure, rendering failure) surface as a generic
//!   500 with no internal detail in the body
//!
//! Server-side detail never goes to the client. Instead it is attached to the
//! response as an [`ErrorDetail`] extension, which the recovery middleware
//! consumes as the single point of detailed logging (method + URI + error).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Internal error detail carried in response extensions.
///
/// The recovery middleware removes this from the response and emits one
/// structured log entry for it; the client only ever sees the generic body.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Startup configuration defect (template cache build failure).
    /// Fatal: the server must not start serving with a partial cache.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database errors from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Session store failures (load/save/delete).
    #[error("session store error: {0}")]
    SessionStore(String),

    /// Template lookup or rendering failure. Always a server-side defect.
    #[error("template error: {0}")]
    Template(String),

    /// JSON serialization failure for session values.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Requested record does not exist (or has expired).
    #[error("not found")]
    NotFound,

    /// Missing or mismatched anti-forgery token on a state-changing request.
    #[error("invalid CSRF token")]
    InvalidCsrf,

    /// Malformed client input that is safe to describe to the user.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Login failed: unknown email or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Signup failed: the email address is already registered.
    #[error("duplicate email")]
    DuplicateEmail,

    /// Unexpected internal failure.
    #[error("internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error is a server-side failure whose detail must be kept
    /// out of the response body.
    fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::Database(_)
                | Self::SessionStore(_)
                | Self::Template(_)
                | Self::Serialization(_)
                | Self::Internal(_)
        )
    }
}

impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        Self::Template(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            // Generic body; the detail travels in an extension so the
            // recovery wrapper can log it with the request method and URI.
            let mut response =
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
            response
                .extensions_mut()
                .insert(ErrorDetail(self.to_string()));
            return response;
        }

        let (status, message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            AppError::InvalidCsrf => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            // Normally handled at the handler edge with a form re-render;
            // if one escapes, answer with a non-sensitive 422.
            AppError::InvalidCredentials | AppError::DuplicateEmail => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            // Covered by is_server_error() above.
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            ),
        };

        (status, message).into_response()
    }
}

/// Convenience alias for results using [`AppError`].
pub type AppResult<T> = Result<T, AppError>;
