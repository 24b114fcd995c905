//! Translation proxy and local language detection.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use prism_domain::ApiRequest;
use prism_infrastructure::http::append_query;

use crate::error::GatewayError;
use crate::routes::AppState;
use crate::upstream::upstream_error;

/// The translation upstream expects a browser user agent.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TranslateRequest {
    #[serde(default)]
    text: String,
    #[serde(default = "default_source")]
    source_lang: String,
    #[serde(default = "default_target")]
    target_lang: String,
}

fn default_source() -> String {
    "ko".to_string()
}

fn default_target() -> String {
    "en".to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TranslateResponse {
    translated_text: String,
}

/// `POST /api/translate` — translates `text` through the translation
/// service.
///
/// A failed upstream call degrades to echoing the input rather than
/// failing the request: a raw prompt is still usable downstream, a
/// hard error is not.
pub async fn translate(
    State(state): State<AppState>,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, GatewayError> {
    if request.text.is_empty() {
        return Err(GatewayError::InvalidBody("text is required"));
    }

    if request.source_lang == request.target_lang {
        return Ok(Json(TranslateResponse {
            translated_text: request.text,
        }));
    }

    let translated = match fetch_translation(&state, &request).await {
        Ok(translated) => translated,
        Err(error) => {
            tracing::warn!(%error, "translation upstream failed, echoing input");
            request.text.clone()
        }
    };

    Ok(Json(TranslateResponse {
        translated_text: translated,
    }))
}

async fn fetch_translation(
    state: &AppState,
    request: &TranslateRequest,
) -> Result<String, GatewayError> {
    let url = append_query(
        &format!("{}/translate_a/single", state.config.translate_url),
        &[
            ("client", "gtx"),
            ("sl", &request.source_lang),
            ("tl", &request.target_lang),
            ("dt", "t"),
            ("q", &request.text),
        ],
    )?;

    let mut upstream_request = ApiRequest::get(url);
    upstream_request.set_header("User-Agent", BROWSER_USER_AGENT);
    let response = state.upstream.fetch(upstream_request).await?;

    if !response.is_success() {
        return Err(upstream_error(&response, "translation failed"));
    }

    // The payload is a nested array: element 0 holds chunks whose first
    // field is the translated text.
    let value: Value = response
        .json()
        .map_err(|_| GatewayError::InvalidBody("unexpected translation payload"))?;
    let translated: String = value
        .get(0)
        .and_then(Value::as_array)
        .map(|chunks| {
            chunks
                .iter()
                .filter_map(|chunk| chunk.get(0).and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if translated.is_empty() {
        Ok(request.text.clone())
    } else {
        Ok(translated)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetectRequest {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DetectResponse {
    detected_language: &'static str,
}

/// `POST /api/translate/detect` — local language detection, no upstream.
///
/// Any Hangul syllable marks the text as Korean; everything else is
/// treated as English.
pub async fn detect(
    Json(request): Json<DetectRequest>,
) -> Result<Json<DetectResponse>, GatewayError> {
    if request.text.is_empty() {
        return Err(GatewayError::InvalidBody("text is required"));
    }

    let detected_language = if request.text.chars().any(is_hangul) {
        "ko"
    } else {
        "en"
    };

    Ok(Json(DetectResponse { detected_language }))
}

const fn is_hangul(ch: char) -> bool {
    matches!(ch, '\u{AC00}'..='\u{D7A3}')
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_hangul_syllable_range() {
        assert!(is_hangul('가'));
        assert!(is_hangul('힣'));
        assert!(!is_hangul('a'));
        assert!(!is_hangul('1'));
    }
}
