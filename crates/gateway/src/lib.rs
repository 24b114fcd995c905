//! Prism Gateway - stateless proxy routes to backend AI services.
//!
//! The gateway owns no session state and performs no retries: each route
//! rewrites an inbound call for its upstream, forwards it once, and
//! translates the answer. Failures local to the gateway (malformed paths,
//! missing parameters) short-circuit with 400 before any upstream I/O.

use std::net::SocketAddr;

use axum::Router;
use axum::http::{HeaderValue, Request};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub mod config;
pub mod error;
pub mod routes;
pub mod upstream;

pub use config::{ConfigError, GatewayConfig};
pub use error::GatewayError;
pub use routes::AppState;

/// Request ids are time-ordered UUIDs so log lines sort by arrival.
#[derive(Debug, Clone, Copy, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = HeaderValue::from_str(&Uuid::now_v7().to_string()).ok()?;
        Some(RequestId::new(id))
    }
}

/// Builds the gateway application: routes plus the observability layers.
///
/// # Errors
/// Returns [`GatewayError`] when the upstream HTTP client cannot be
/// constructed.
pub fn app(config: GatewayConfig) -> Result<Router, GatewayError> {
    let state = AppState::new(config)?;
    Ok(routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(CorsLayer::permissive()))
}

/// Binds the configured address and serves the gateway until shutdown.
///
/// # Errors
/// Returns an error when the address cannot be bound or the server fails.
pub async fn run_server(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let router = app(config)?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "gateway listening");
    axum::serve(listener, router).await?;

    Ok(())
}
