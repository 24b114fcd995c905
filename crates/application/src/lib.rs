//! Prism Application - client policy over transport ports
//!
//! This crate owns everything between the domain types and the wire: the
//! session store, the single-flight refresh coordinator, and the
//! interceptor pipeline of [`ApiClient`]. It talks to the network only
//! through the [`ports::HttpTransport`] trait, so every policy in here is
//! testable against a scripted transport.

pub mod auth;
pub mod client;
pub mod error;
pub mod ports;
pub mod session_store;

pub use auth::{AuthEvent, AuthEvents, RefreshConfig, RefreshCoordinator};
pub use client::{ApiClient, ReplayPolicy};
pub use error::{ClientError, ClientResult};
pub use ports::{Clock, HttpTransport, TransportError};
pub use session_store::SessionStore;
