//! Object-detection proxy: file listing, upload, persistence and image
//! retrieval against the computer-vision service.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use prism_domain::{ApiRequest, HttpMethod, RequestBody, normalize_upstream_path};
use prism_infrastructure::http::{append_query, infer_content_type};

use crate::error::GatewayError;
use crate::routes::AppState;
use crate::upstream::{relay_json, upstream_error};

/// Stored artifacts live under this root on the vision service; anything
/// else is rejected locally.
const IMAGE_PATH_PREFIX: &str = "app/";

const DEFAULT_TASK_TYPE: &str = "detection";

#[derive(Debug, Deserialize)]
pub(crate) struct TaskQuery {
    task_type: Option<String>,
}

impl TaskQuery {
    fn task_type(&self) -> &str {
        self.task_type.as_deref().unwrap_or(DEFAULT_TASK_TYPE)
    }
}

/// `GET /api/detection/files?task_type=` — lists processed files.
pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> Result<Json<Value>, GatewayError> {
    let url = append_query(
        &format!("{}/yolo/files", state.config.vision_url),
        &[("task_type", query.task_type())],
    )?;

    let mut request = ApiRequest::get(url);
    request.set_header("Content-Type", "application/json");
    let response = state.upstream.fetch(request).await?;
    Ok(Json(relay_json(&response, "file listing failed")?))
}

/// `POST /api/detection/upload?task_type=` — relays a multipart upload.
///
/// The body is forwarded byte-for-byte with the inbound Content-Type
/// preserved: the multipart boundary lives in that header, so rebuilding
/// either would corrupt the upload.
pub async fn upload(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, GatewayError> {
    let url = append_query(
        &format!("{}/yolo/upload", state.config.vision_url),
        &[("task_type", query.task_type())],
    )?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let mut request = ApiRequest::new(HttpMethod::Post, url);
    request.body = RequestBody::Raw {
        content_type,
        content: body.to_vec(),
    };

    let response = state.upstream.fetch(request).await?;
    Ok(Json(relay_json(&response, "upload failed")?))
}

#[derive(Debug, Deserialize)]
pub(crate) struct SaveQuery {
    original_path: Option<String>,
    result_path: Option<String>,
    task_type: Option<String>,
}

/// `POST /api/detection/save?original_path=&result_path=&task_type=` —
/// persists a processed pair. Both paths are required; their absence is a
/// local 400, never an upstream call.
pub async fn save(
    State(state): State<AppState>,
    Query(query): Query<SaveQuery>,
) -> Result<Json<Value>, GatewayError> {
    let original_path = query
        .original_path
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or(GatewayError::MissingParam("original_path"))?;
    let result_path = query
        .result_path
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or(GatewayError::MissingParam("result_path"))?;
    let task_type = query.task_type.as_deref().unwrap_or(DEFAULT_TASK_TYPE);

    let url = append_query(
        &format!("{}/yolo/save", state.config.vision_url),
        &[
            ("original_path", original_path),
            ("result_path", result_path),
            ("task_type", task_type),
        ],
    )?;

    let mut request = ApiRequest::new(HttpMethod::Post, url);
    request.set_header("Content-Type", "application/json");
    let response = state.upstream.fetch(request).await?;
    Ok(Json(relay_json(&response, "save failed")?))
}

/// `GET /api/detection/image/{*path}` — fetches a stored image.
///
/// The client-supplied path is normalized and prefix-checked before any
/// upstream byte is fetched; the upstream payload is relayed with an
/// inferred content type.
pub async fn image(
    State(state): State<AppState>,
    Path(raw_path): Path<String>,
) -> Result<Response, GatewayError> {
    let path = normalize_upstream_path(&raw_path, IMAGE_PATH_PREFIX)?;

    let mut url = Url::parse(&state.config.vision_url)
        .map_err(|e| GatewayError::Unreachable(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| GatewayError::Unreachable("vision URL cannot be a base".to_string()))?
        .pop_if_empty()
        .extend(["yolo", "image"])
        .extend(path.split('/'));

    let mut request = ApiRequest::get(String::from(url));
    request.set_header("Accept", "image/*");
    let response = state.upstream.fetch(request).await?;

    if !response.is_success() {
        return Err(upstream_error(&response, "unable to load image"));
    }

    let content_type = infer_content_type(&path, response.content_type(), "image/jpeg");
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CACHE_CONTROL,
                "public, max-age=3600".to_string(),
            ),
        ],
        response.body,
    )
        .into_response())
}
