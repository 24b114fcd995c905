//! Single-flight refresh coordination.
//!
//! At most one refresh exchange is ever in flight. The first caller to
//! find the machine `Idle` performs the exchange; everyone arriving while
//! it runs parks a oneshot in the waiter queue and is settled, in enqueue
//! order, with whatever the exchange produced. The state lives behind one
//! mutex, so the guarantee holds on a multi-threaded runtime and not just
//! on a cooperative event loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, oneshot};

use prism_domain::{ApiRequest, AuthError, HttpMethod, TokenGrant};

use crate::auth::events::{AuthEvent, AuthEvents, LOGIN_REDIRECT};
use crate::ports::HttpTransport;
use crate::session_store::SessionStore;

/// What a settled refresh hands to each caller: the new token, or `None`
/// when the backend rotated the credential inside its own cookie and sent
/// no body token.
type RefreshOutcome = Result<Option<String>, AuthError>;

/// Refresh exchange configuration.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Absolute URL of the refresh endpoint.
    pub refresh_url: String,
    /// Upper bound on the exchange. Expiry counts as a refresh rejection,
    /// so a hung exchange cannot stall queued callers indefinitely.
    pub timeout: Duration,
}

impl RefreshConfig {
    /// Default exchange timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Configuration for the given refresh endpoint URL.
    pub fn new(refresh_url: impl Into<String>) -> Self {
        Self {
            refresh_url: refresh_url.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the exchange timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// The coordinator's two states.
enum RefreshState {
    /// No exchange in flight.
    Idle,
    /// An exchange is in flight; these callers are waiting on it.
    Refreshing {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
}

/// Serializes refresh-token exchanges across concurrent callers.
pub struct RefreshCoordinator<T: HttpTransport> {
    transport: Arc<T>,
    session: Arc<SessionStore>,
    events: AuthEvents,
    config: RefreshConfig,
    state: Mutex<RefreshState>,
}

impl<T: HttpTransport> RefreshCoordinator<T> {
    /// Creates a coordinator over the given transport and session.
    pub fn new(
        transport: Arc<T>,
        session: Arc<SessionStore>,
        events: AuthEvents,
        config: RefreshConfig,
    ) -> Self {
        Self {
            transport,
            session,
            events,
            config,
            state: Mutex::new(RefreshState::Idle),
        }
    }

    /// Obtains a fresh access token, sharing one exchange among all
    /// concurrent callers.
    ///
    /// `Ok(None)` means the backend rotated its cookie without returning a
    /// body token; the transport's cookie jar already carries the new
    /// credential.
    ///
    /// # Errors
    /// Returns the refresh failure after clearing the session and emitting
    /// [`AuthEvent::SessionExpired`] once for the whole batch of callers.
    pub async fn refresh(&self) -> RefreshOutcome {
        let receiver = {
            let mut state = self.state.lock().await;
            match &mut *state {
                RefreshState::Refreshing { waiters } => {
                    let (sender, receiver) = oneshot::channel();
                    waiters.push(sender);
                    Some(receiver)
                }
                RefreshState::Idle => {
                    *state = RefreshState::Refreshing {
                        waiters: Vec::new(),
                    };
                    None
                }
            }
        };

        if let Some(receiver) = receiver {
            // Parked: settled by the in-flight exchange, in enqueue order.
            return receiver
                .await
                .unwrap_or(Err(AuthError::Unauthenticated));
        }

        let outcome = self.exchange().await;

        let waiters = {
            let mut state = self.state.lock().await;
            match std::mem::replace(&mut *state, RefreshState::Idle) {
                RefreshState::Refreshing { waiters } => waiters,
                RefreshState::Idle => Vec::new(),
            }
        };
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }

        outcome
    }

    /// The exchange configuration this coordinator runs with.
    #[must_use]
    pub const fn config(&self) -> &RefreshConfig {
        &self.config
    }

    /// Number of callers currently parked behind the in-flight exchange.
    pub async fn pending(&self) -> usize {
        match &*self.state.lock().await {
            RefreshState::Idle => 0,
            RefreshState::Refreshing { waiters } => waiters.len(),
        }
    }

    /// Whether an exchange is currently in flight.
    pub async fn is_refreshing(&self) -> bool {
        matches!(&*self.state.lock().await, RefreshState::Refreshing { .. })
    }

    /// Performs the actual exchange: a credentialed, empty-body POST to the
    /// refresh endpoint. The refresh token rides along in the transport's
    /// cookie jar.
    async fn exchange(&self) -> RefreshOutcome {
        let request = ApiRequest::new(HttpMethod::Post, self.config.refresh_url.clone());

        let response =
            match tokio::time::timeout(self.config.timeout, self.transport.execute(&request)).await
            {
                Err(_elapsed) => return self.fail(AuthError::RefreshTimeout).await,
                Ok(Err(transport_error)) => {
                    return self.fail(AuthError::Network(transport_error.to_string())).await;
                }
                Ok(Ok(response)) => response,
            };

        if !response.is_success() {
            return self
                .fail(AuthError::RefreshFailed {
                    status: response.status,
                    message: response.text(),
                })
                .await;
        }

        match TokenGrant::from_body(&response.body) {
            Some(grant) => {
                self.session
                    .set_access_token(Some(&grant.access_token), grant.expires_in)
                    .await;
                self.events.emit(AuthEvent::TokenRefreshed {
                    expires_in: grant.expires_in,
                });
                Ok(Some(grant.access_token))
            }
            // Cookie-only rotation: nothing to store, callers retry with
            // the refreshed cookie attached automatically.
            None => Ok(None),
        }
    }

    /// Terminal refresh failure: session gone, callers must log in again.
    async fn fail(&self, error: AuthError) -> RefreshOutcome {
        self.session.logout().await;
        self.events.emit(AuthEvent::SessionExpired {
            redirect: LOGIN_REDIRECT.to_string(),
        });
        Err(error)
    }
}

impl<T: HttpTransport> std::fmt::Debug for RefreshCoordinator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refresh_url", &self.config.refresh_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    use crate::ports::{Clock, TransportError};
    use prism_domain::ApiResponse;

    const REFRESH_URL: &str = "https://auth.example.com/api/auth/refresh";

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::from_timestamp(1_700_000_000, 0).unwrap()
        }
    }

    /// Transport that blocks each exchange until released, counting calls.
    struct GatedTransport {
        calls: AtomicUsize,
        gate: Notify,
        released: StdMutex<bool>,
        response: StdMutex<Option<ApiResponse>>,
    }

    impl GatedTransport {
        fn new(response: ApiResponse) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                gate: Notify::new(),
                released: StdMutex::new(false),
                response: StdMutex::new(Some(response)),
            }
        }

        fn release(&self) {
            *self.released.lock().unwrap() = true;
            self.gate.notify_waiters();
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpTransport for GatedTransport {
        async fn execute(&self, _request: &ApiRequest) -> Result<ApiResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            loop {
                let notified = self.gate.notified();
                if *self.released.lock().unwrap() {
                    break;
                }
                notified.await;
            }
            Ok(self.response.lock().unwrap().take().expect("one exchange only"))
        }
    }

    fn json_response(status: u16, body: serde_json::Value) -> ApiResponse {
        ApiResponse::new(
            status,
            HashMap::new(),
            serde_json::to_vec(&body).unwrap(),
            std::time::Duration::ZERO,
        )
    }

    fn coordinator(
        transport: Arc<GatedTransport>,
        events: AuthEvents,
    ) -> (Arc<RefreshCoordinator<GatedTransport>>, Arc<SessionStore>) {
        let session = Arc::new(SessionStore::new(Arc::new(FixedClock)));
        let coordinator = Arc::new(RefreshCoordinator::new(
            transport,
            Arc::clone(&session),
            events,
            RefreshConfig::new(REFRESH_URL),
        ));
        (coordinator, session)
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_exchange() {
        let transport = Arc::new(GatedTransport::new(json_response(
            200,
            serde_json::json!({"access_token": "fresh", "expires_in": 60}),
        )));
        let (coordinator, session) = coordinator(Arc::clone(&transport), AuthEvents::disabled());

        let leader = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.refresh().await })
        };

        // Wait for the leader to take the exchange before parking waiters.
        while !coordinator.is_refreshing().await {
            tokio::task::yield_now().await;
        }

        let mut waiters = Vec::new();
        for n in 1..=4 {
            let task_coordinator = Arc::clone(&coordinator);
            waiters.push(tokio::spawn(async move { task_coordinator.refresh().await }));
            while coordinator.pending().await < n {
                tokio::task::yield_now().await;
            }
        }

        transport.release();

        let leader_outcome = leader.await.unwrap();
        assert_eq!(leader_outcome, Ok(Some("fresh".to_string())));
        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), Ok(Some("fresh".to_string())));
        }

        assert_eq!(transport.calls(), 1);
        assert!(session.is_token_valid().await);
        assert!(!coordinator.is_refreshing().await);
    }

    #[tokio::test]
    async fn test_waiters_settle_in_enqueue_order() {
        let transport = Arc::new(GatedTransport::new(json_response(
            200,
            serde_json::json!({"access_token": "fresh"}),
        )));
        let (coordinator, _session) = coordinator(Arc::clone(&transport), AuthEvents::disabled());

        let leader = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.refresh().await })
        };
        while !coordinator.is_refreshing().await {
            tokio::task::yield_now().await;
        }

        let order = Arc::new(StdMutex::new(Vec::new()));
        let mut waiters = Vec::new();
        for index in 0..5 {
            let task_coordinator = Arc::clone(&coordinator);
            let order = Arc::clone(&order);
            waiters.push(tokio::spawn(async move {
                let outcome = task_coordinator.refresh().await;
                order.lock().unwrap().push(index);
                outcome
            }));
            while coordinator.pending().await < index + 1 {
                tokio::task::yield_now().await;
            }
        }

        transport.release();
        leader.await.unwrap().unwrap();
        for waiter in waiters {
            waiter.await.unwrap().unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_rejected_exchange_fails_every_caller_and_redirects_once() {
        let transport = Arc::new(GatedTransport::new(json_response(
            403,
            serde_json::json!({"detail": "refresh token expired"}),
        )));
        let (events, mut receiver) = AuthEvents::channel();
        let (coordinator, session) = coordinator(Arc::clone(&transport), events);
        session.set_access_token(Some("stale"), 600).await;

        let leader = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.refresh().await })
        };
        while !coordinator.is_refreshing().await {
            tokio::task::yield_now().await;
        }

        let mut waiters = Vec::new();
        for n in 1..=3 {
            let task_coordinator = Arc::clone(&coordinator);
            waiters.push(tokio::spawn(async move { task_coordinator.refresh().await }));
            while coordinator.pending().await < n {
                tokio::task::yield_now().await;
            }
        }

        transport.release();

        let expected = AuthError::RefreshFailed {
            status: 403,
            message: r#"{"detail":"refresh token expired"}"#.to_string(),
        };
        assert_eq!(leader.await.unwrap(), Err(expected.clone()));
        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), Err(expected.clone()));
        }

        // Session cleared, and exactly one redirect for the whole batch.
        assert!(!session.is_authenticated().await);
        assert_eq!(
            receiver.try_recv(),
            Ok(AuthEvent::SessionExpired {
                redirect: "/login".to_string()
            })
        );
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cookie_only_rotation_yields_no_token() {
        let transport = Arc::new(GatedTransport::new(json_response(
            200,
            serde_json::json!({}),
        )));
        transport.release();
        let (coordinator, session) = coordinator(transport, AuthEvents::disabled());

        assert_eq!(coordinator.refresh().await, Ok(None));
        // Nothing stored; the cookie jar carries the credential.
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_coordinator_returns_to_idle_after_each_exchange() {
        let transport = Arc::new(GatedTransport::new(json_response(
            200,
            serde_json::json!({"access_token": "first"}),
        )));
        transport.release();
        let (coordinator, _session) = coordinator(Arc::clone(&transport), AuthEvents::disabled());

        assert_eq!(coordinator.refresh().await, Ok(Some("first".to_string())));
        assert!(!coordinator.is_refreshing().await);

        // A later refresh starts a new exchange rather than reusing state.
        *transport.response.lock().unwrap() = Some(json_response(
            200,
            serde_json::json!({"access_token": "second"}),
        ));
        assert_eq!(coordinator.refresh().await, Ok(Some("second".to_string())));
        assert_eq!(transport.calls(), 2);
    }

    struct HangingTransport;

    #[async_trait]
    impl HttpTransport for HangingTransport {
        async fn execute(&self, _request: &ApiRequest) -> Result<ApiResponse, TransportError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_exchange_times_out_as_rejection() {
        let session = Arc::new(SessionStore::new(Arc::new(FixedClock)));
        session.set_access_token(Some("stale"), 600).await;
        let (events, mut receiver) = AuthEvents::channel();
        let coordinator = RefreshCoordinator::new(
            Arc::new(HangingTransport),
            Arc::clone(&session),
            events,
            RefreshConfig::new(REFRESH_URL).with_timeout(Duration::from_millis(100)),
        );

        assert_eq!(coordinator.refresh().await, Err(AuthError::RefreshTimeout));
        assert!(!session.is_authenticated().await);
        assert!(matches!(
            receiver.try_recv(),
            Ok(AuthEvent::SessionExpired { .. })
        ));
    }
}
