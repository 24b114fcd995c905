//! Gateway configuration.
//!
//! Everything comes from the environment: the listen address plus one base
//! URL per backend service. Defaults point at the local development
//! services.

use thiserror::Error;

/// Errors reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric variable did not parse.
    #[error("{name} must be a valid {expected}: {value}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// What was expected.
        expected: &'static str,
        /// The offending value.
        value: String,
    },
}

/// Resolved gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Base URL of the diffusion image-generation service.
    pub diffusion_url: String,
    /// Base URL of the computer-vision service.
    pub vision_url: String,
    /// Base URL of the model/analysis backend.
    pub analysis_url: String,
    /// Base URL of the translation service.
    pub translate_url: String,
}

impl GatewayConfig {
    /// Reads configuration from `PRISM_*` environment variables.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when `PRISM_PORT` is not a valid port.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port_raw = env_or("PRISM_PORT", "8888");
        let port = port_raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
            name: "PRISM_PORT",
            expected: "port number",
            value: port_raw,
        })?;

        Ok(Self {
            host: env_or("PRISM_HOST", "0.0.0.0"),
            port,
            diffusion_url: base_url(env_or("PRISM_DIFFUSION_URL", "http://localhost:8000")),
            vision_url: base_url(env_or("PRISM_VISION_URL", "http://localhost:9008")),
            analysis_url: base_url(env_or("PRISM_ANALYSIS_URL", "http://localhost:8080")),
            translate_url: base_url(env_or(
                "PRISM_TRANSLATE_URL",
                "https://translate.googleapis.com",
            )),
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Base URLs are joined with path fragments by simple concatenation, so a
/// trailing slash would produce doubled separators.
fn base_url(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_trailing_slashes_are_trimmed() {
        assert_eq!(base_url("http://cv.local/".to_string()), "http://cv.local");
        assert_eq!(base_url("http://cv.local".to_string()), "http://cv.local");
    }
}
