//! # Source Fetching
//!
//! The restore pipeline only needs `GET(url) -> bytes`. Anything other than a
//! successful response, including transport errors and timeouts, is reported as
//! `FetchFailed`; nothing is retried here.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{COOKIE, HeaderMap, HeaderName, HeaderValue, REFERER, USER_AGENT};
use tracing::debug;

use crate::config::RestoreConfig;
use crate::error::{RestoreError, RestoreResult};

/// Abstract interface for downloading scrambled pages.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download the body at `url`.
    async fn fetch(&self, url: &str) -> RestoreResult<Vec<u8>>;
}

#[async_trait]
impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    async fn fetch(&self, url: &str) -> RestoreResult<Vec<u8>> {
        (**self).fetch(url).await
    }
}

/// `reqwest`-backed fetcher with per-client timeout and request headers.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client from the fetch-related parts of the configuration.
    pub fn new(config: &RestoreConfig) -> RestoreResult<Self> {
        let headers = default_headers(config)?;
        let client = Client::builder()
            .timeout(config.fetch_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| RestoreError::config("http_client", "", e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> RestoreResult<Vec<u8>> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                RestoreError::fetch_transport(url, "request timed out", e)
                    .with_recovery_suggestion("raise the fetch timeout or retry later")
            } else {
                let reason = e.to_string();
                RestoreError::fetch_transport(url, reason, e)
                    .with_recovery_suggestion("check that the host is reachable")
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RestoreError::fetch_failed(
                url,
                Some(status.as_u16()),
                status
                    .canonical_reason()
                    .unwrap_or("non-success status")
                    .to_string(),
            )
            .with_recovery_suggestion(status_suggestion(status.as_u16())));
        }

        let body = response.bytes().await.map_err(|e| {
            let reason = if e.is_timeout() {
                "body read timed out".to_string()
            } else {
                e.to_string()
            };
            RestoreError::fetch_transport(url, reason, e)
                .with_recovery_suggestion("retry later")
        })?;
        debug!(%url, bytes = body.len(), "fetched scrambled page");
        Ok(body.to_vec())
    }
}

/// What the caller can do about a non-success status.
fn status_suggestion(status: u16) -> &'static str {
    match status {
        401 | 403 => "the host refused the request; send the Referer or Cookie it expects",
        404 | 410 => "check the URL; the page is not on the host",
        408 | 429 => "slow down and retry later",
        s if s >= 500 => "the host is failing; retry later",
        _ => "check the URL and request headers",
    }
}

fn default_headers(config: &RestoreConfig) -> RestoreResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, header_value("user_agent", &config.user_agent)?);
    if let Some(referer) = &config.referer {
        headers.insert(REFERER, header_value("referer", referer)?);
    }
    if let Some(cookie) = &config.cookie {
        headers.insert(COOKIE, header_value("cookie", cookie)?);
    }
    for (name, value) in &config.headers {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| RestoreError::config("headers", name.clone(), e.to_string()))?;
        headers.insert(header, header_value("headers", value)?);
    }
    Ok(headers)
}

fn header_value(field: &str, value: &str) -> RestoreResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| RestoreError::config(field, value.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_headers_from_config() {
        let mut config = RestoreConfig::default();
        config.referer = Some("https://reader.example.com/".to_string());
        config.cookie = Some("session=abc".to_string());
        config
            .headers
            .push(("X-Requested-With".to_string(), "XMLHttpRequest".to_string()));

        let headers = default_headers(&config).unwrap();
        assert_eq!(headers[REFERER], "https://reader.example.com/");
        assert_eq!(headers[COOKIE], "session=abc");
        assert_eq!(headers["x-requested-with"], "XMLHttpRequest");
        assert!(headers.contains_key(USER_AGENT));
    }

    #[test]
    fn test_status_suggestions() {
        assert!(status_suggestion(403).contains("Referer"));
        assert!(status_suggestion(404).contains("URL"));
        assert!(status_suggestion(503).contains("retry"));
        assert!(status_suggestion(429).contains("retry"));
    }

    #[test]
    fn test_bad_header_is_a_config_error() {
        let mut config = RestoreConfig::default();
        config.referer = Some("line\nbreak".to_string());
        assert_eq!(default_headers(&config).unwrap_err().category(), "config");
    }
}
