//! Upstream fetch-and-translate helpers.
//!
//! Every proxy route forwards one request, reads the upstream response
//! exactly once, and translates it: error statuses become the normalized
//! envelope, success bodies pass through as JSON (or get wrapped as
//! `{ "message": <text> }` when the upstream answered with plain text).

use serde_json::Value;

use prism_application::HttpTransport;
use prism_domain::{ApiRequest, ApiResponse};
use prism_infrastructure::ReqwestTransport;
use prism_infrastructure::http::is_json;

use crate::error::GatewayError;

/// Shared upstream HTTP client. Holds no per-request state.
#[derive(Debug)]
pub struct UpstreamClient {
    transport: ReqwestTransport,
}

impl UpstreamClient {
    /// Creates the client.
    ///
    /// # Errors
    /// Returns [`GatewayError::Unreachable`] when the transport cannot be
    /// constructed.
    pub fn new() -> Result<Self, GatewayError> {
        Ok(Self {
            transport: ReqwestTransport::new()?,
        })
    }

    /// Forwards a request upstream. Transport failures surface as 502;
    /// error statuses come back as ordinary responses for the caller to
    /// translate.
    ///
    /// # Errors
    /// Returns [`GatewayError::Unreachable`] when no response was obtained.
    pub async fn fetch(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        Ok(self.transport.execute(&request).await?)
    }
}

/// Parses an upstream body: JSON if it parses, raw text otherwise.
#[must_use]
pub fn body_as_value(response: &ApiResponse) -> Value {
    serde_json::from_slice(&response.body)
        .unwrap_or_else(|_| Value::String(response.text()))
}

/// Builds the normalized error for a non-success upstream response.
///
/// The summary prefers the upstream's own `detail`/`error` field and falls
/// back to the route's context message.
#[must_use]
pub fn upstream_error(response: &ApiResponse, context: &str) -> GatewayError {
    let details = body_as_value(response);
    let message = details
        .get("detail")
        .or_else(|| details.get("error"))
        .and_then(Value::as_str)
        .unwrap_or(context)
        .to_string();

    GatewayError::Upstream {
        status: response.status,
        message,
        details,
    }
}

/// Translates an upstream response into a JSON payload.
///
/// Non-JSON success bodies are wrapped as `{ "message": <text> }`.
///
/// # Errors
/// Returns the normalized upstream error for non-success statuses.
pub fn relay_json(response: &ApiResponse, context: &str) -> Result<Value, GatewayError> {
    if !response.is_success() {
        return Err(upstream_error(response, context));
    }

    if response.content_type().is_some_and(is_json) {
        if let Ok(value) = serde_json::from_slice(&response.body) {
            return Ok(value);
        }
    }
    // Some upstreams omit or mislabel the content type; try JSON anyway
    // before falling back to a text wrapper.
    Ok(serde_json::from_slice(&response.body)
        .unwrap_or_else(|_| serde_json::json!({ "message": response.text() })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::time::Duration;

    fn response(status: u16, body: &[u8]) -> ApiResponse {
        ApiResponse::new(status, HashMap::new(), body.to_vec(), Duration::ZERO)
    }

    #[test]
    fn test_success_json_passes_through() {
        let value = relay_json(&response(200, br#"{"files": []}"#), "listing failed").unwrap();
        assert_eq!(value, serde_json::json!({"files": []}));
    }

    #[test]
    fn test_success_text_wraps_as_message() {
        let value = relay_json(&response(200, b"saved"), "save failed").unwrap();
        assert_eq!(value, serde_json::json!({"message": "saved"}));
    }

    #[test]
    fn test_error_prefers_upstream_detail() {
        let error = upstream_error(
            &response(422, br#"{"detail": "unsupported format"}"#),
            "upload failed",
        );
        match error {
            GatewayError::Upstream {
                status, message, ..
            } => {
                assert_eq!(status, 422);
                assert_eq!(message, "unsupported format");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_falls_back_to_context() {
        let error = upstream_error(&response(500, b"boom"), "upload failed");
        match error {
            GatewayError::Upstream {
                status,
                message,
                details,
            } => {
                assert_eq!(status, 500);
                assert_eq!(message, "upload failed");
                assert_eq!(details, serde_json::json!("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
