//! The authenticated API client.
//!
//! [`ApiClient`] is the interceptor pipeline around a transport: it
//! attaches the bearer token on the way out, harvests tokens carried in
//! response bodies on the way in, and recovers a 401 by running one
//! refresh exchange through the [`RefreshCoordinator`] and replaying the
//! request at most once.

use std::sync::Arc;

use prism_domain::{ApiRequest, ApiResponse, AuthError, HttpMethod, TokenGrant};

use crate::auth::{
    AuthEvent, AuthEvents, REFRESH_ENDPOINT_PATH, RefreshConfig, RefreshCoordinator,
};
use crate::error::{ClientError, ClientResult};
use crate::ports::{Clock, HttpTransport};
use crate::session_store::SessionStore;

const AUTHORIZATION: &str = "Authorization";

/// Whether a 401 response may be replayed after a successful refresh.
///
/// The upstream behavior this client descends from replayed every method
/// indiscriminately; `IdempotentOnly` is the conservative alternative for
/// deployments where a duplicated POST is worse than a failed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayPolicy {
    /// Replay any method after refresh.
    #[default]
    Always,
    /// Replay only idempotent methods; a 401 on POST/PATCH is terminal.
    IdempotentOnly,
}

impl ReplayPolicy {
    /// Whether this policy permits replaying the given method.
    #[must_use]
    pub const fn allows(self, method: HttpMethod) -> bool {
        match self {
            Self::Always => true,
            Self::IdempotentOnly => method.is_idempotent(),
        }
    }
}

/// An HTTP client with silent access-token refresh.
pub struct ApiClient<T: HttpTransport> {
    transport: Arc<T>,
    session: Arc<SessionStore>,
    coordinator: Arc<RefreshCoordinator<T>>,
    events: AuthEvents,
    replay_policy: ReplayPolicy,
}

impl<T: HttpTransport> ApiClient<T> {
    /// Creates a client against the auth backend at `auth_base_url`.
    ///
    /// The refresh endpoint is derived by appending the fixed exchange
    /// path to the base URL.
    pub fn new(transport: Arc<T>, clock: Arc<dyn Clock>, auth_base_url: &str) -> Self {
        let refresh_url = format!(
            "{}{REFRESH_ENDPOINT_PATH}",
            auth_base_url.trim_end_matches('/')
        );
        Self::with_config(transport, clock, RefreshConfig::new(refresh_url))
    }

    /// Creates a client with explicit refresh configuration.
    pub fn with_config(transport: Arc<T>, clock: Arc<dyn Clock>, config: RefreshConfig) -> Self {
        let session = Arc::new(SessionStore::new(clock));
        let events = AuthEvents::disabled();
        let coordinator = Arc::new(RefreshCoordinator::new(
            Arc::clone(&transport),
            Arc::clone(&session),
            events.clone(),
            config,
        ));
        Self {
            transport,
            session,
            coordinator,
            events,
            replay_policy: ReplayPolicy::default(),
        }
    }

    /// Connects an event outlet, rebuilding the coordinator to share it.
    #[must_use]
    pub fn with_events(mut self, events: AuthEvents) -> Self {
        self.events = events.clone();
        let config = self.coordinator.config().clone();
        self.coordinator = Arc::new(RefreshCoordinator::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.session),
            events,
            config,
        ));
        self
    }

    /// Sets the replay policy for 401 recovery.
    #[must_use]
    pub const fn with_replay_policy(mut self, policy: ReplayPolicy) -> Self {
        self.replay_policy = policy;
        self
    }

    /// The session store backing this client.
    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// The refresh coordinator backing this client.
    #[must_use]
    pub fn coordinator(&self) -> &Arc<RefreshCoordinator<T>> {
        &self.coordinator
    }

    /// Executes a GET request.
    ///
    /// # Errors
    /// See [`ApiClient::execute`].
    pub async fn get(&self, url: impl Into<String> + Send) -> ClientResult<ApiResponse> {
        self.execute(ApiRequest::get(url)).await
    }

    /// Executes a POST request with a JSON body.
    ///
    /// # Errors
    /// See [`ApiClient::execute`].
    pub async fn post_json(
        &self,
        url: impl Into<String> + Send,
        body: serde_json::Value,
    ) -> ClientResult<ApiResponse> {
        self.execute(ApiRequest::post_json(url, body)).await
    }

    /// Executes a request through the interceptor pipeline.
    ///
    /// Statuses other than 401 pass through untouched, error statuses
    /// included; the caller decides what a 404 means.
    ///
    /// # Errors
    /// - [`ClientError::Transport`] when no response could be obtained.
    /// - [`ClientError::Auth`] when a 401 could not be recovered: the
    ///   request was the refresh exchange itself, was already replayed,
    ///   the policy forbids replaying it, or the refresh was rejected.
    ///   The session is cleared in every one of those cases.
    pub async fn execute(&self, mut request: ApiRequest) -> ClientResult<ApiResponse> {
        if request.header(AUTHORIZATION).is_none()
            && let Some(bearer) = self.session.bearer_header().await
        {
            request.set_header(AUTHORIZATION, bearer);
        }

        let mut retried = false;
        loop {
            let response = self.transport.execute(&request).await?;

            if !response.is_unauthorized() {
                self.harvest(&response).await;
                return Ok(response);
            }

            // A 401 on the exchange itself, on an already-replayed request,
            // or on a request the policy refuses to replay is terminal.
            if retried
                || request.url.contains(REFRESH_ENDPOINT_PATH)
                || !self.replay_policy.allows(request.method)
            {
                self.session.logout().await;
                return Err(ClientError::Auth(AuthError::Unauthenticated));
            }

            // On a cookie-only rotation the exchange yields no token; the
            // replay then relies on the refreshed cookie in the jar.
            if let Some(token) = self.coordinator.refresh().await? {
                request.set_header(AUTHORIZATION, format!("Bearer {token}"));
            }
            retried = true;
        }
    }

    /// Stores a token carried in a successful response body.
    async fn harvest(&self, response: &ApiResponse) {
        if !response.is_success() {
            return;
        }
        if let Some(grant) = TokenGrant::from_body(&response.body) {
            self.session
                .set_access_token(Some(&grant.access_token), grant.expires_in)
                .await;
            self.events.emit(AuthEvent::TokenStored {
                expires_in: grant.expires_in,
            });
        }
    }
}

impl<T: HttpTransport> std::fmt::Debug for ApiClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("replay_policy", &self.replay_policy)
            .finish_non_exhaustive()
    }
}
