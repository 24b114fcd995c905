//! Generic passthrough to the model/analysis backend.

use axum::Json;
use axum::extract::{Path, RawQuery, State};
use serde_json::Value;
use url::Url;

use prism_domain::ApiRequest;

use crate::error::GatewayError;
use crate::routes::AppState;
use crate::upstream::relay_json;

/// `GET /api/analysis/{*path}` — forwards the call, query string and all,
/// to the analysis backend and relays its JSON.
pub async fn passthrough(
    State(state): State<AppState>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<Value>, GatewayError> {
    let mut url = Url::parse(&state.config.analysis_url)
        .map_err(|e| GatewayError::Unreachable(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| GatewayError::Unreachable("analysis URL cannot be a base".to_string()))?
        .pop_if_empty()
        .extend(["api", "ai"])
        .extend(path.split('/'));
    url.set_query(query.as_deref().filter(|q| !q.is_empty()));

    let mut request = ApiRequest::get(String::from(url));
    request.set_header("Content-Type", "application/json");
    let response = state.upstream.fetch(request).await?;
    Ok(Json(relay_json(&response, "analysis request failed")?))
}
