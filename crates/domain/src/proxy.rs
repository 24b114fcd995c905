//! Upstream path rules and the gateway's error envelope.
//!
//! The image-retrieval proxy accepts client-supplied paths that have passed
//! through browsers, object-storage keys and Windows tooling, so they
//! arrive with backslashes, stray `#` marks and doubled separators. They
//! are folded into a canonical `/`-separated form here, and anything not
//! rooted at the expected prefix is rejected before a single upstream byte
//! is fetched.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Normalizes a client-supplied upstream path.
///
/// Folds `\` and `#` into `/`, collapses runs of separators into one,
/// strips any leading separator, and requires the result to start with
/// `required_prefix`.
///
/// # Errors
/// Returns [`DomainError::InvalidPath`] when the input is empty after
/// folding or is not rooted at `required_prefix`.
pub fn normalize_upstream_path(raw: &str, required_prefix: &str) -> DomainResult<String> {
    let mut normalized = String::with_capacity(raw.len());
    let mut last_was_separator = false;

    for ch in raw.chars() {
        let ch = match ch {
            '\\' | '#' => '/',
            other => other,
        };
        if ch == '/' {
            if last_was_separator {
                continue;
            }
            last_was_separator = true;
        } else {
            last_was_separator = false;
        }
        normalized.push(ch);
    }

    let normalized = normalized.trim_start_matches('/').to_string();

    if normalized.is_empty() || !normalized.starts_with(required_prefix) {
        return Err(DomainError::InvalidPath(normalized));
    }

    Ok(normalized)
}

/// The gateway's normalized error body.
///
/// Every proxy route answers failures with this envelope so callers render
/// one shape regardless of which upstream misbehaved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Human-readable error summary.
    pub error: String,
    /// Upstream HTTP status, when one was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Upstream body or local diagnostic detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorEnvelope {
    /// An envelope with only a message.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            status: None,
            details: None,
        }
    }

    /// An envelope describing an upstream failure.
    pub fn upstream(error: impl Into<String>, status: u16, details: serde_json::Value) -> Self {
        Self {
            error: error.into(),
            status: Some(status),
            details: Some(details),
        }
    }
}
