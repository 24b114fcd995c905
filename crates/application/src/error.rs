//! Application error types

use thiserror::Error;

use prism_domain::AuthError;

use crate::ports::TransportError;

/// Errors surfaced to callers of the authenticated client.
///
/// HTTP error statuses other than the intercepted 401 are not errors at
/// this level; they pass through as ordinary responses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Authentication failed terminally; the session has been cleared.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
