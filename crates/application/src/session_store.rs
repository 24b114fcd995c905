//! Shared session state with expiry tracking.
//!
//! The store is constructed explicitly and passed by `Arc`; its lifetime
//! is the lifetime of the client that owns it. Time comes in through the
//! [`Clock`] port so expiry can be tested with a manual clock.

use std::sync::Arc;

use tokio::sync::RwLock;

use prism_domain::{DEFAULT_TOKEN_TTL_SECS, Session};

use crate::ports::Clock;

/// Thread-safe store for the single client session.
pub struct SessionStore {
    session: RwLock<Session>,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    /// Creates an empty store reading time from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            session: RwLock::new(Session::new()),
            clock,
        }
    }

    /// Replaces the stored token.
    ///
    /// A non-null token is stored with `expiry = now + expires_in_secs`
    /// and the session becomes authenticated; `None` clears everything.
    pub async fn set_access_token(&self, token: Option<&str>, expires_in_secs: i64) {
        let now = self.clock.now();
        self.session.write().await.set_token(token, expires_in_secs, now);
    }

    /// Replaces the stored token with the default ten-minute expiry.
    pub async fn set_access_token_default(&self, token: Option<&str>) {
        self.set_access_token(token, DEFAULT_TOKEN_TTL_SECS).await;
    }

    /// True iff a token is present and not yet expired.
    pub async fn is_token_valid(&self) -> bool {
        let now = self.clock.now();
        self.session.read().await.is_valid(now)
    }

    /// The current token, regardless of validity.
    pub async fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .access_token()
            .map(ToString::to_string)
    }

    /// An `Authorization` header value, only while the token is valid.
    pub async fn bearer_header(&self) -> Option<String> {
        let now = self.clock.now();
        let session = self.session.read().await;
        if session.is_valid(now) {
            session.access_token().map(|token| format!("Bearer {token}"))
        } else {
            None
        }
    }

    /// Whether the session currently holds a token.
    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_authenticated()
    }

    /// Clears token, expiry and the authenticated flag unconditionally.
    pub async fn logout(&self) {
        self.session.write().await.clear();
    }

    /// A copy of the current session state.
    pub async fn snapshot(&self) -> Session {
        self.session.read().await.clone()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use std::sync::Mutex;

    struct MockClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl MockClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap()),
            })
        }

        fn advance(&self, secs: i64) {
            let mut now = self.now.lock().unwrap();
            *now += Duration::seconds(secs);
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    #[tokio::test]
    async fn test_token_valid_until_simulated_expiry() {
        let clock = MockClock::new();
        let store = SessionStore::new(Arc::clone(&clock) as Arc<dyn Clock>);

        store.set_access_token(Some("tok"), 600).await;
        assert!(store.is_token_valid().await);

        clock.advance(599);
        assert!(store.is_token_valid().await);

        clock.advance(2);
        assert!(!store.is_token_valid().await);
    }

    #[tokio::test]
    async fn test_clearing_token_invalidates_immediately() {
        let clock = MockClock::new();
        let store = SessionStore::new(clock);

        store.set_access_token(Some("tok"), 600).await;
        store.set_access_token(None, 600).await;

        assert!(!store.is_token_valid().await);
        assert!(!store.is_authenticated().await);
        assert_eq!(store.access_token().await, None);
    }

    #[tokio::test]
    async fn test_bearer_header_only_while_valid() {
        let clock = MockClock::new();
        let store = SessionStore::new(Arc::clone(&clock) as Arc<dyn Clock>);

        assert_eq!(store.bearer_header().await, None);

        store.set_access_token(Some("abc"), 60).await;
        assert_eq!(store.bearer_header().await, Some("Bearer abc".to_string()));

        clock.advance(61);
        assert_eq!(store.bearer_header().await, None);
        // The token itself is still present, just expired.
        assert_eq!(store.access_token().await, Some("abc".to_string()));
    }

    #[tokio::test]
    async fn test_logout_resets_session() {
        let clock = MockClock::new();
        let store = SessionStore::new(clock);

        store.set_access_token_default(Some("tok")).await;
        store.logout().await;

        let session = store.snapshot().await;
        assert!(!session.is_authenticated());
        assert_eq!(session.access_token(), None);
    }
}
