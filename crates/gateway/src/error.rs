//! Gateway error type and its HTTP rendering.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use prism_application::TransportError;
use prism_domain::{DomainError, ErrorEnvelope};

/// Failures a proxy route can produce.
///
/// Local validation failures short-circuit with 400 before any upstream
/// call; upstream failures relay the upstream status. Nothing here is
/// retried.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The client-supplied upstream path failed normalization.
    #[error("invalid upstream path: {0}")]
    InvalidPath(String),

    /// A required query parameter was absent.
    #[error("missing required parameter: {0}")]
    MissingParam(&'static str),

    /// The request body failed local validation.
    #[error("{0}")]
    InvalidBody(&'static str),

    /// The upstream answered with an error status.
    #[error("upstream returned {status}: {message}")]
    Upstream {
        /// Upstream HTTP status, relayed to the caller.
        status: u16,
        /// Summary for the envelope's `error` field.
        message: String,
        /// Upstream body, JSON if it parsed, text otherwise.
        details: serde_json::Value,
    },

    /// The upstream could not be reached at all.
    #[error("upstream unreachable: {0}")]
    Unreachable(String),
}

impl From<DomainError> for GatewayError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::InvalidPath(path) => Self::InvalidPath(path),
            other => Self::Unreachable(other.to_string()),
        }
    }
}

impl From<TransportError> for GatewayError {
    fn from(error: TransportError) -> Self {
        Self::Unreachable(error.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, envelope) = match self {
            Self::InvalidPath(path) => (
                StatusCode::BAD_REQUEST,
                ErrorEnvelope::new(format!("invalid path: {path}")),
            ),
            Self::MissingParam(name) => (
                StatusCode::BAD_REQUEST,
                ErrorEnvelope::new(format!("{name} is required")),
            ),
            Self::InvalidBody(message) => {
                (StatusCode::BAD_REQUEST, ErrorEnvelope::new(message))
            }
            Self::Upstream {
                status,
                message,
                details,
            } => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                ErrorEnvelope::upstream(message, status, details),
            ),
            Self::Unreachable(message) => (
                StatusCode::BAD_GATEWAY,
                ErrorEnvelope::new(format!("upstream unreachable: {message}")),
            ),
        };

        (status, Json(envelope)).into_response()
    }
}
