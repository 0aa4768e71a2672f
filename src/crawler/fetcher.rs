//! HTTP fetcher implementation
//!
//! This module handles every request made to the audited host:
//! - Building the HTTP client with the audit user agent
//! - GET requests for pages, robots.txt and sitemaps
//! - Crawl-delay spacing through the shared `HostThrottle`
//! - Explicit per-request timeouts
//! - Error classification

use crate::config::AuditConfig;
use crate::crawler::throttle::HostThrottle;
use reqwest::{redirect::Policy, Client};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

/// Maximum redirect hops followed for a single fetch
const MAX_REDIRECTS: usize = 10;

/// Errors that fail a single fetch
///
/// These are page-scoped: the analysis pipeline records them on the page
/// and moves on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP {0}")]
    HttpStatus(u16),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not an HTML document (Content-Type: {0})")]
    NotHtml(String),

    #[error("Failed to read response body: {0}")]
    Body(String),
}

/// A successfully fetched HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,

    /// HTTP status code
    pub status_code: u16,

    /// Content-Type header value (empty when absent)
    pub content_type: String,

    /// Page body
    pub body: String,

    /// Time from request start to the end of the body (milliseconds)
    pub response_time_ms: u64,

    /// Content-Length header, when the server sent one
    pub content_length: Option<u64>,
}

/// Builds an HTTP client with the audit user agent
///
/// Timeouts are applied per request, since page fetches and robots/sitemap
/// fetches use different limits.
///
/// # Arguments
///
/// * `config` - The runtime audit settings
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &AuditConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(config.page_fetch_timeout)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches documents from the audited host, one throttled request at a time
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    throttle: Arc<HostThrottle>,
}

impl PageFetcher {
    /// Creates a fetcher sharing the given throttle
    pub fn new(client: Client, throttle: Arc<HostThrottle>) -> Self {
        Self { client, throttle }
    }

    /// The throttle spacing this fetcher's requests
    pub fn throttle(&self) -> &Arc<HostThrottle> {
        &self.throttle
    }

    /// Fetches an HTML page
    ///
    /// # Request Flow
    ///
    /// 1. Wait for a crawl-delay turn on the host
    /// 2. Send GET, following up to 10 redirects
    /// 3. Non-2xx → `HttpStatus`
    /// 4. Content-Type present and not HTML → `NotHtml`
    /// 5. Read the body, all within `timeout`
    ///
    /// # Arguments
    ///
    /// * `url` - The page URL
    /// * `timeout` - Deadline for the whole request, body included
    pub async fn fetch_page(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchError> {
        self.throttle.wait_turn().await;
        tracing::debug!("Fetching page {}", url);

        let started = Instant::now();
        let fetch = async {
            let response = self
                .client
                .get(url.clone())
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| classify_error(e, timeout))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::HttpStatus(status.as_u16()));
            }

            let final_url = response.url().clone();
            let content_length = response.content_length();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();

            if !content_type.is_empty() && !is_html_content_type(&content_type) {
                return Err(FetchError::NotHtml(content_type));
            }

            let body = response.text().await.map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout {
                        timeout_ms: timeout.as_millis() as u64,
                    }
                } else {
                    FetchError::Body(e.to_string())
                }
            })?;

            Ok(FetchedPage {
                final_url,
                status_code: status.as_u16(),
                content_type,
                body,
                response_time_ms: 0,
                content_length,
            })
        };

        let mut page = with_deadline(fetch, timeout).await?;
        page.response_time_ms = started.elapsed().as_millis() as u64;
        Ok(page)
    }

    /// Fetches a text resource such as robots.txt or a sitemap
    ///
    /// No Content-Type check is made; sitemaps are served under many types.
    pub async fn fetch_text(&self, url: &Url, timeout: Duration) -> Result<String, FetchError> {
        self.throttle.wait_turn().await;
        tracing::debug!("Fetching {}", url);

        let fetch = async {
            let response = self
                .client
                .get(url.clone())
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| classify_error(e, timeout))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::HttpStatus(status.as_u16()));
            }

            response
                .text()
                .await
                .map_err(|e| classify_error(e, timeout))
        };

        with_deadline(fetch, timeout).await
    }
}

/// Enforces `timeout` on a whole fetch, in case the client-level timeout
/// does not cover a stalled body read
async fn with_deadline<T, F>(fetch: F, timeout: Duration) -> Result<T, FetchError>
where
    F: std::future::Future<Output = Result<T, FetchError>>,
{
    match tokio::time::timeout(timeout, fetch).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

/// Maps a reqwest error onto the fetch error taxonomy
fn classify_error(error: reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    } else if error.is_connect() {
        FetchError::Network(format!("Connection failed: {}", error))
    } else if error.is_redirect() {
        FetchError::Network(format!("Redirect error: {}", error))
    } else if let Some(status) = error.status() {
        FetchError::HttpStatus(status.as_u16())
    } else {
        FetchError::Network(error.to_string())
    }
}

/// Checks whether a Content-Type header denotes an HTML document
pub fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}
