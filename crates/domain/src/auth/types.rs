//! Token grants and authentication errors.

use serde::Deserialize;
use thiserror::Error;

/// Default access-token time-to-live when a response carries a token but no
/// expiry: ten minutes.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 600;

/// An access token carried in a response body.
///
/// The auth backend spells its fields either `snake_case` or `camelCase`
/// depending on the endpoint, so both spellings deserialize into the same
/// grant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    /// The bearer token itself.
    #[serde(alias = "accessToken")]
    pub access_token: String,
    /// Seconds until the token expires.
    #[serde(default = "default_expires_in", alias = "expiresIn")]
    pub expires_in: i64,
}

const fn default_expires_in() -> i64 {
    DEFAULT_TOKEN_TTL_SECS
}

impl TokenGrant {
    /// Extracts a grant from an already-parsed JSON value.
    ///
    /// Returns `None` when the value carries no token under either field
    /// spelling, or an empty one.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value::<Self>(value.clone())
            .ok()
            .filter(|grant| !grant.access_token.is_empty())
    }

    /// Probes a raw response body for a grant.
    ///
    /// Non-JSON bodies and JSON bodies without a token yield `None`; a
    /// token-bearing body is an optional feature of any response, never a
    /// requirement.
    #[must_use]
    pub fn from_body(body: &[u8]) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_slice(body).ok()?;
        Self::from_json(&value)
    }
}

/// Authentication failures surfaced by the client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The refresh exchange was rejected by the auth backend.
    #[error("token refresh failed with status {status}: {message}")]
    RefreshFailed {
        /// HTTP status returned by the refresh endpoint.
        status: u16,
        /// Response body or transport message.
        message: String,
    },

    /// The refresh exchange did not settle within the configured timeout.
    #[error("token refresh timed out")]
    RefreshTimeout,

    /// Terminal authentication failure: the session is no longer usable and
    /// the caller must re-authenticate.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The refresh exchange could not be transported at all.
    #[error("network error during refresh: {0}")]
    Network(String),
}
