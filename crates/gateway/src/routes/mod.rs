//! Proxy route handlers.
//!
//! Each handler is a stateless function: rewrite the inbound call into the
//! shape its upstream expects, forward it, translate the answer. No
//! retries, no shared mutable state; upstream failures surface directly.

mod analysis;
mod detection;
mod diffusion;
mod translate;

use std::sync::Arc;

use axum::{
    Json, Router,
    routing::{get, post},
};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::upstream::UpstreamClient;

/// Shared, immutable route state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Resolved backend base URLs.
    pub config: Arc<GatewayConfig>,
    /// The one upstream HTTP client.
    pub upstream: Arc<UpstreamClient>,
}

impl AppState {
    /// Builds the state for a configuration.
    ///
    /// # Errors
    /// Returns [`GatewayError::Unreachable`] when the upstream client
    /// cannot be constructed.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            config: Arc::new(config),
            upstream: Arc::new(UpstreamClient::new()?),
        })
    }
}

/// Assembles the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/diffusion/generate", post(diffusion::generate))
        .route("/api/detection/files", get(detection::list_files))
        .route("/api/detection/upload", post(detection::upload))
        .route("/api/detection/save", post(detection::save))
        .route("/api/detection/image/{*path}", get(detection::image))
        .route("/api/analysis/{*path}", get(analysis::passthrough))
        .route("/api/translate", post(translate::translate))
        .route("/api/translate/detect", post(translate::detect))
        .with_state(state)
}

/// Liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
