//! Authentication coordination for the Prism client.
//!
//! This module provides:
//! - The single-flight refresh coordinator and its state machine
//! - Auth lifecycle events for out-of-band observers

mod coordinator;
mod events;

pub use coordinator::{RefreshConfig, RefreshCoordinator};
pub use events::{AuthEvent, AuthEvents, LOGIN_REDIRECT};

/// Path of the refresh-token exchange on the auth backend.
pub const REFRESH_ENDPOINT_PATH: &str = "/api/auth/refresh";
