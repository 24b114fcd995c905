//! Prism Infrastructure - adapters for the application ports
//!
//! Everything that actually touches the network or the system clock lives
//! here, behind the traits defined in `prism-application`.

pub mod adapters;
pub mod http;

pub use adapters::{ReqwestTransport, SystemClock};
