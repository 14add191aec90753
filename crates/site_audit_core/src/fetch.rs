//! crates/site_audit_core/src/fetch.rs
//!
//! Input normalization and response checks shared by every `PageFetcher`.

use url::Url;

use crate::ports::FetchError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_MAX_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_MAX_REDIRECTS: usize = 10;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Turns user input (a bare domain or a full URL) into an absolute http(s) URL.
///
/// A missing scheme becomes `https://`.
pub fn normalize_url(input: &str) -> Result<Url, FetchError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(FetchError::InvalidUrl(
            input.to_string(),
            "empty input".to_string(),
        ));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&candidate)
        .map_err(|e| FetchError::InvalidUrl(input.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrl(
            input.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(FetchError::InvalidUrl(
            input.to_string(),
            "missing host".to_string(),
        ));
    }

    Ok(url)
}

/// Whether a `Content-Type` header value denotes an HTML document.
/// A missing header is accepted since some servers omit it.
pub fn is_html_content_type(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(ct) => {
            let mime = ct.split(';').next().unwrap_or_default().trim();
            mime.eq_ignore_ascii_case("text/html")
                || mime.eq_ignore_ascii_case("application/xhtml+xml")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_domain_gets_https() {
        let url = normalize_url("example.com").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn explicit_scheme_is_kept() {
        let url = normalize_url("  http://example.com/path?q=1 ").unwrap();
        assert_eq!(url.as_str(), "http://example.com/path?q=1");
    }

    #[test]
    fn rejects_unusable_input() {
        assert!(matches!(normalize_url(""), Err(FetchError::InvalidUrl(..))));
        assert!(matches!(
            normalize_url("ftp://example.com"),
            Err(FetchError::InvalidUrl(..))
        ));
        assert!(matches!(
            normalize_url("https://"),
            Err(FetchError::InvalidUrl(..))
        ));
    }

    #[test]
    fn html_content_types() {
        assert!(is_html_content_type(None));
        assert!(is_html_content_type(Some("text/html; charset=utf-8")));
        assert!(is_html_content_type(Some("Application/XHTML+XML")));
        assert!(!is_html_content_type(Some("application/json")));
        assert!(!is_html_content_type(Some("image/png")));
    }
}
