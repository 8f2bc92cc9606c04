//! Page fetching
//!
//! This module defines the contract the crawl engine uses to obtain pages and
//! the default HTTP implementation of it, including:
//! - Building HTTP clients from the fetcher configuration
//! - Content-Type checks (only HTML is rendered into a document)
//! - Redirect handling (each hop is checked before it is requested)
//! - Error classification into [`FetchError`] categories

use crate::config::FetcherConfig;
use crate::url::is_same_host;
use crate::FetchError;
use async_trait::async_trait;
use reqwest::{header, redirect::Policy, Client, Response};
use std::time::Duration;
use url::Url;

/// A page snapshot after any client-side rendering has settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// Final URL of the page (after redirects)
    pub url: Url,

    /// Serialized DOM
    pub html: String,
}

impl RenderedDocument {
    /// Creates a new rendered document
    pub fn new(url: Url, html: impl Into<String>) -> Self {
        Self {
            url,
            html: html.into(),
        }
    }
}

/// Retrieves rendered documents for the crawl engine
///
/// How a document is produced (plain HTTP, a headless browser, a stored
/// snapshot) and when it counts as ready is entirely up to the implementation.
/// Retries, if any, also belong here; the engine never retries a failed fetch.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the page at `url`
    ///
    /// # Returns
    ///
    /// * `Ok(RenderedDocument)` - The rendered page
    /// * `Err(FetchError)` - The page could not be obtained
    async fn fetch(&self, url: &Url) -> Result<RenderedDocument, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// The client never follows redirects itself; [`HttpFetcher`] follows them
/// hop by hop so an off-site target is refused before it is requested.
///
/// # Example
///
/// ```no_run
/// use site_context::config::FetcherConfig;
/// use site_context::crawler::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Static-HTML fetcher backed by reqwest
///
/// Suitable for sites that render on the server. No JavaScript is executed.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_redirects: usize,
}

impl HttpFetcher {
    /// Creates a fetcher with a client built from `config`
    pub fn new(config: &FetcherConfig) -> crate::Result<Self> {
        Ok(Self {
            client: build_http_client(config)?,
            max_redirects: config.max_redirects,
        })
    }

    /// Sends GET requests for `url`, following same-host redirects by hand
    async fn follow_redirects(&self, url: &Url) -> Result<Response, FetchError> {
        let host = url.host_str().unwrap_or_default();
        let mut current = url.clone();
        let mut hops = 0;

        loop {
            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(|e| classify_error(url, e))?;

            if !response.status().is_redirection() {
                return Ok(response);
            }

            // A redirect without a usable Location is reported as its status
            let Some(location) = response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
            else {
                return Ok(response);
            };

            let next = current.join(&location).map_err(|e| FetchError::Blocked {
                url: url.to_string(),
                reason: format!("invalid redirect location '{}': {}", location, e),
            })?;

            if !matches!(next.scheme(), "http" | "https") || !is_same_host(&next, host) {
                return Err(FetchError::Blocked {
                    url: url.to_string(),
                    reason: format!("redirected off-site to {}", next),
                });
            }

            hops += 1;
            if hops > self.max_redirects {
                return Err(FetchError::Blocked {
                    url: url.to_string(),
                    reason: format!("more than {} redirects", self.max_redirects),
                });
            }

            tracing::debug!("Following redirect {} -> {}", current, next);
            current = next;
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    /// Fetches a URL with full error handling
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 2xx with HTML (or missing) Content-Type | `RenderedDocument` |
    /// | Request or body timeout | `Timeout` |
    /// | Connection refused, DNS, TLS, body read error | `Network` |
    /// | Non-2xx status | `HttpStatus` |
    /// | Non-HTML Content-Type | `Blocked` |
    /// | Redirect to another host | `Blocked` |
    /// | Redirect limit exceeded | `Blocked` |
    async fn fetch(&self, url: &Url) -> Result<RenderedDocument, FetchError> {
        let response = self.follow_redirects(url).await?;

        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_html_content_type(&content_type) {
            return Err(FetchError::Blocked {
                url: url.to_string(),
                reason: format!("unsupported content type '{}'", content_type),
            });
        }

        let body = response.text().await.map_err(|e| classify_error(url, e))?;

        Ok(RenderedDocument::new(final_url, body))
    }
}

/// Maps a reqwest error onto a fetch error category
fn classify_error(url: &Url, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

/// Returns true for HTML content types; a missing header is treated as HTML
fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    mime.is_empty() || mime == "text/html" || mime == "application/xhtml+xml"
}
