//! URL resolution for manifest entries and fallback documents.

use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a manifest entry against the worker origin.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve relative paths (`./`, `css/x.css`) against `base`;
///    absolute URLs are kept as they are
/// 3. Reject schemes other than http/https
/// 4. Lowercase the host
/// 5. Remove fragment (#...)
/// 6. Keep query string intact (do not reorder)
pub fn resolve(base: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = base.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}
