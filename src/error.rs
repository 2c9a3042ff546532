//! Gateway error types with HTTP status code mapping.
//!
//! [`DispenserError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and a JSON body carrying a
//! human-readable message.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::DispenserId;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "message": "Dispenser is already open",
///   "code": 2101
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub message: String,
    /// Numeric error code (see the code ranges on [`DispenserError`]).
    pub code: u32,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category              | HTTP Status                 |
/// |-----------|-----------------------|-----------------------------|
/// | 1000–1099 | Validation            | 400 Bad Request             |
/// | 1100–1199 | Authentication        | 401 Unauthorized            |
/// | 2000–2099 | Not Found             | 404 Not Found               |
/// | 2100–2199 | Dispenser state       | 400 Bad Request             |
/// | 3000–3999 | Server                | 500 Internal Server Error   |
#[derive(Debug, thiserror::Error)]
pub enum DispenserError {
    /// Request validation failed (missing or out-of-range fields).
    #[error("{0}")]
    InvalidRequest(String),

    /// Missing, malformed or expired credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Dispenser with the given ID was not found.
    #[error("Dispenser not found")]
    DispenserNotFound(DispenserId),

    /// No route matches the requested path.
    #[error("Resource not found")]
    RouteNotFound,

    /// `open` was called on a dispenser that is already open.
    #[error("Dispenser is already open")]
    AlreadyOpen(DispenserId),

    /// `close` was called on a dispenser that is already closed.
    #[error("Dispenser is already closed")]
    AlreadyClosed(DispenserId),

    /// The dispenser claims to be open but has no in-progress usage record.
    #[error("No open transaction found")]
    InternalInconsistency(DispenserId),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DispenserError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Unauthorized(_) => 1101,
            Self::DispenserNotFound(_) => 2001,
            Self::RouteNotFound => 2002,
            Self::AlreadyOpen(_) => 2101,
            Self::AlreadyClosed(_) => 2102,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::InternalInconsistency(_) => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::AlreadyOpen(_) | Self::AlreadyClosed(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::DispenserNotFound(_) | Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::InternalInconsistency(_) | Self::PersistenceError(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JsonRejection> for DispenserError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for DispenserError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidRequest(format!("Invalid path parameter: {}", rejection.body_text()))
    }
}

impl IntoResponse for DispenserError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.error_code(), error = %self, "request rejected");
        }
        let body = ErrorResponse {
            message: self.to_string(),
            code: self.error_code(),
        };
        (status, axum::Json(body)).into_response()
    }
}
