//! HTTP transport port

use async_trait::async_trait;
use thiserror::Error;

use prism_domain::{ApiRequest, ApiResponse};

/// Errors a transport can produce.
///
/// These cover only failures to complete an exchange; a response with an
/// error status is still a response and comes back as `Ok`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not complete within its timeout.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout that elapsed.
        timeout_ms: u64,
    },

    /// The host could not be resolved.
    #[error("DNS resolution failed for {host}: {message}")]
    Dns {
        /// Host that failed to resolve.
        host: String,
        /// Resolver message.
        message: String,
    },

    /// The remote actively refused the connection.
    #[error("connection refused by {host}:{port}")]
    ConnectionRefused {
        /// Remote host.
        host: String,
        /// Remote port.
        port: u16,
    },

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The request URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The redirect limit was exceeded.
    #[error("too many redirects (max {max})")]
    TooManyRedirects {
        /// Configured redirect limit.
        max: usize,
    },

    /// Any other transport-level failure.
    #[error("{0}")]
    Other(String),
}

/// Port for executing HTTP requests.
///
/// Implementations own connection reuse and the cookie jar; the jar is
/// what carries the HTTP-only refresh credential, which this layer never
/// reads or writes directly.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Executes a request and reads the response body to completion.
    ///
    /// # Errors
    /// Returns a [`TransportError`] when no response could be obtained;
    /// error statuses are returned as responses.
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}
