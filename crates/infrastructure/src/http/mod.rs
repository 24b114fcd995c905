//! HTTP helpers shared by the gateway's forwarding code.

use prism_domain::{DomainError, DomainResult};

/// Decides the content type to relay for an upstream payload.
///
/// The upstream's own header wins; otherwise the type is guessed from the
/// path's extension, falling back to `fallback` when the extension says
/// nothing.
#[must_use]
pub fn infer_content_type(path: &str, upstream: Option<&str>, fallback: &str) -> String {
    if let Some(content_type) = upstream {
        return content_type.to_string();
    }
    mime_guess::from_path(path)
        .first()
        .map_or_else(|| fallback.to_string(), |mime| mime.to_string())
}

/// Whether a content type denotes a JSON payload, `+json` suffixes
/// included.
#[must_use]
pub fn is_json(content_type: &str) -> bool {
    content_type
        .parse::<mime::Mime>()
        .is_ok_and(|m| m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON))
}

/// Appends an encoded query string to a URL.
///
/// # Errors
/// Returns [`DomainError::InvalidUrl`] when the parameters cannot be
/// form-encoded.
pub fn append_query(url: &str, params: &[(&str, &str)]) -> DomainResult<String> {
    if params.is_empty() {
        return Ok(url.to_string());
    }
    let query =
        serde_urlencoded::to_string(params).map_err(|e| DomainError::InvalidUrl(e.to_string()))?;
    Ok(format!("{url}?{query}"))
}
