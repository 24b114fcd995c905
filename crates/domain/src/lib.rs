//! Prism Domain - Core business types
//!
//! This crate defines the domain model shared by the Prism client SDK and
//! the API gateway. All types here are pure Rust with no I/O dependencies;
//! anything that needs the current time takes it as an argument.

pub mod auth;
pub mod error;
pub mod proxy;
pub mod request;
pub mod response;

pub use auth::{AuthError, DEFAULT_TOKEN_TTL_SECS, Session, TokenGrant};
pub use error::{DomainError, DomainResult};
pub use proxy::{ErrorEnvelope, normalize_upstream_path};
pub use request::{ApiRequest, Header, HttpMethod, RequestBody};
pub use response::ApiResponse;
