//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the application core and external
//! systems. Each port is a trait implemented by an adapter in the
//! infrastructure layer.

mod clock;
mod transport;

pub use clock::Clock;
pub use transport::{HttpTransport, TransportError};
