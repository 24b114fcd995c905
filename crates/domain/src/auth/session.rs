//! In-memory session state for the authenticated client.

use chrono::{DateTime, Duration, Utc};

use crate::auth::types::DEFAULT_TOKEN_TTL_SECS;

/// The client's view of its authentication state: at most one short-lived
/// access token plus its expiry.
///
/// The long-lived refresh credential never appears here; it lives in an
/// HTTP-only cookie owned by the transport's cookie jar.
///
/// Invariant: `authenticated == access_token.is_some()`, and `expires_at`
/// is `Some` exactly when a token is held. The fields are private so the
/// invariant can only be touched through [`Session::set_token`] and
/// [`Session::clear`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    access_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    authenticated: bool,
}

impl Session {
    /// Creates an empty, unauthenticated session.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            access_token: None,
            expires_at: None,
            authenticated: false,
        }
    }

    /// Replaces the stored token.
    ///
    /// A non-null token computes `expiry = now + expires_in_secs` and marks
    /// the session authenticated; `None` clears token, expiry and the
    /// authenticated flag.
    pub fn set_token(&mut self, token: Option<&str>, expires_in_secs: i64, now: DateTime<Utc>) {
        match token {
            Some(token) => {
                self.access_token = Some(token.to_string());
                self.expires_at = Some(now + Duration::seconds(expires_in_secs));
                self.authenticated = true;
            }
            None => self.clear(),
        }
    }

    /// Replaces the stored token using the default time-to-live.
    pub fn set_token_default_ttl(&mut self, token: Option<&str>, now: DateTime<Utc>) {
        self.set_token(token, DEFAULT_TOKEN_TTL_SECS, now);
    }

    /// True iff a token is present and `now` is strictly before its expiry.
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        match (&self.access_token, self.expires_at) {
            (Some(_), Some(expires_at)) => now < expires_at,
            _ => false,
        }
    }

    /// Clears token, expiry and the authenticated flag unconditionally.
    pub fn clear(&mut self) {
        self.access_token = None;
        self.expires_at = None;
        self.authenticated = false;
    }

    /// The current access token, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// When the current token expires, if one is held.
    #[must_use]
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the session currently holds a token.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}
