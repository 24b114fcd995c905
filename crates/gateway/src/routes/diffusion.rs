//! Image-generation proxy.

use axum::Json;
use axum::extract::State;
use serde_json::Value;

use prism_domain::ApiRequest;

use crate::error::GatewayError;
use crate::routes::AppState;
use crate::upstream::relay_json;

/// `POST /api/diffusion/generate` — forwards a generation request to the
/// diffusion service and relays its answer.
///
/// The service reports artifact locations as paths relative to itself;
/// those are absolutized against its base URL so callers can fetch them
/// without knowing the topology.
pub async fn generate(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, GatewayError> {
    let url = format!("{}/api/v1/generate", state.config.diffusion_url);
    let response = state.upstream.fetch(ApiRequest::post_json(url, body)).await?;

    let mut value = relay_json(&response, "image generation failed")?;
    absolutize(&mut value, "image_url", &state.config.diffusion_url);
    absolutize(&mut value, "meta_url", &state.config.diffusion_url);
    Ok(Json(value))
}

fn absolutize(value: &mut Value, key: &str, base: &str) {
    if let Some(relative) = value.get(key).and_then(Value::as_str)
        && !relative.starts_with("http")
    {
        value[key] = Value::String(format!("{base}{relative}"));
    }
}
