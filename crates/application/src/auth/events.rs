//! Auth lifecycle events.

use tokio::sync::mpsc;

/// Where callers are sent when the session ends.
pub const LOGIN_REDIRECT: &str = "/login";

/// Events emitted by the session store and refresh coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A token arrived in an ordinary response body and was stored.
    TokenStored {
        /// Seconds until the stored token expires.
        expires_in: i64,
    },
    /// The refresh exchange produced a new token.
    TokenRefreshed {
        /// Seconds until the refreshed token expires.
        expires_in: i64,
    },
    /// The refresh credential is gone; the caller must re-authenticate.
    ///
    /// This is the library rendition of a browser redirect: emitted exactly
    /// once per failed refresh, with the target the UI should navigate to.
    SessionExpired {
        /// Navigation target for the embedding UI.
        redirect: String,
    },
}

/// A cloneable, optional event outlet.
///
/// A disabled outlet swallows events, so emission sites never branch on
/// whether anyone is listening.
#[derive(Debug, Clone, Default)]
pub struct AuthEvents {
    sender: Option<mpsc::UnboundedSender<AuthEvent>>,
}

impl AuthEvents {
    /// An outlet that drops every event.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { sender: None }
    }

    /// Creates a connected outlet and its receiving end.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AuthEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// Emits an event; a closed or absent receiver is ignored.
    pub fn emit(&self, event: AuthEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}
