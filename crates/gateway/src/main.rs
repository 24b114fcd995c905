//! Prism Gateway binary.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = prism_gateway::GatewayConfig::from_env()?;

    tracing::info!("Starting Prism Gateway v{}", env!("CARGO_PKG_VERSION"));

    prism_gateway::run_server(config).await?;

    Ok(())
}
