//! services/api/src/adapters/fetcher.rs
//!
//! The HTTP adapter for the `PageFetcher` port, built on `reqwest`.
//!
//! Compression is negotiated by hand (`Accept-Encoding: gzip` plus a `flate2`
//! decoder) so the response's `Content-Encoding` survives for the speed score.

use std::io::Read;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use flate2::read::GzDecoder;
use reqwest::header::{
    HeaderName, ACCEPT, ACCEPT_ENCODING, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_TYPE,
};
use reqwest::{redirect, Client};
use site_audit_core::domain::{FetchedPage, PageTiming};
use site_audit_core::fetch::is_html_content_type;
use site_audit_core::ports::{FetchError, PageFetcher};
use tracing::{debug, warn};

use crate::config::FetchSettings;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A `PageFetcher` that performs a single GET with bounded time and size.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout: Duration,
    max_bytes: u64,
}

impl ReqwestFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .redirect(redirect::Policy::limited(settings.max_redirects))
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            timeout: settings.timeout,
            max_bytes: settings.max_bytes,
        })
    }

    fn map_request_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if err.is_redirect() {
            FetchError::Unreachable(format!("too many redirects: {}", err))
        } else {
            FetchError::Unreachable(err.to_string())
        }
    }
}

//=========================================================================================
// `PageFetcher` Trait Implementation
//=========================================================================================

#[async_trait]
impl PageFetcher for ReqwestFetcher {
    async fn fetch_page(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let started = Instant::now();
        let mut response = self
            .client
            .get(url)
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .header(ACCEPT_ENCODING, "gzip")
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
        };
        let content_type = header(CONTENT_TYPE);
        let content_encoding = header(CONTENT_ENCODING).filter(|v| !v.is_empty());
        let cache_control = header(CACHE_CONTROL);

        if !is_html_content_type(content_type.as_deref()) {
            return Err(FetchError::NotHtml(content_type.unwrap_or_default()));
        }

        // Check content-length header if available
        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                return Err(FetchError::TooLarge(self.max_bytes));
            }
        }

        let final_url = response.url().to_string();
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.map_request_error(e))?
        {
            body.extend_from_slice(&chunk);
            // Content-length may be missing or wrong
            if body.len() as u64 > self.max_bytes {
                return Err(FetchError::TooLarge(self.max_bytes));
            }
        }
        let transfer_bytes = body.len() as u64;

        let decoded = match content_encoding.as_deref() {
            Some(enc) if enc.eq_ignore_ascii_case("gzip") => gunzip(&body, self.max_bytes)?,
            Some(enc) if !enc.eq_ignore_ascii_case("identity") => {
                warn!(url, encoding = enc, "Unsupported content encoding, using body as-is");
                body
            }
            _ => body,
        };
        let load_time_ms = started.elapsed().as_millis() as u64;

        let timing = PageTiming {
            load_time_ms,
            page_size_bytes: decoded.len() as u64,
            transfer_bytes,
            content_encoding,
            cache_control,
        };
        debug!(url, final_url = %final_url, ?timing, "Fetched page");

        Ok(FetchedPage {
            requested_url: url.to_string(),
            final_url,
            html: String::from_utf8_lossy(&decoded).into_owned(),
            timing,
        })
    }
}

/// Decompresses a gzip body, refusing output larger than `max_bytes`.
fn gunzip(body: &[u8], max_bytes: u64) -> Result<Vec<u8>, FetchError> {
    let mut decoded = Vec::new();
    GzDecoder::new(body)
        .take(max_bytes + 1)
        .read_to_end(&mut decoded)
        .map_err(|e| FetchError::Decode(e.to_string()))?;
    if decoded.len() as u64 > max_bytes {
        return Err(FetchError::TooLarge(max_bytes));
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn gunzip_restores_body() {
        let html = b"<html><body>compressed</body></html>";
        assert_eq!(gunzip(&gzip(html), 1024).unwrap(), html.to_vec());
    }

    #[test]
    fn gunzip_enforces_decoded_limit() {
        let html = vec![b'a'; 4096];
        assert_eq!(gunzip(&gzip(&html), 100), Err(FetchError::TooLarge(100)));
    }

    #[test]
    fn gunzip_rejects_garbage() {
        assert!(matches!(gunzip(b"not gzip", 1024), Err(FetchError::Decode(_))));
    }
}
