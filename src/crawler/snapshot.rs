//! In-memory snapshot fetcher
//!
//! Serves pre-captured pages from a map keyed by normalized URL. Useful for
//! replaying a site that was rendered earlier, and as a deterministic backend
//! in tests.

use crate::crawler::fetcher::{Fetcher, RenderedDocument};
use crate::url::normalize_url;
use crate::{FetchError, UrlResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
enum Snapshot {
    Page(String),
    Redirect(Url),
    Failure(FetchError),
}

/// Fetcher that answers from stored snapshots
///
/// URLs with no snapshot fail with HTTP 404. Every fetch call is logged so
/// callers can inspect what was requested.
#[derive(Debug, Default)]
pub struct SnapshotFetcher {
    snapshots: HashMap<String, Snapshot>,
    delay: Option<Duration>,
    fetch_log: Mutex<Vec<Url>>,
}

impl SnapshotFetcher {
    /// Creates an empty snapshot fetcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the HTML served for `url`
    pub fn insert_page(&mut self, url: &str, html: impl Into<String>) -> UrlResult<()> {
        let key = normalize_url(url)?;
        self.snapshots
            .insert(key.to_string(), Snapshot::Page(html.into()));
        Ok(())
    }

    /// Makes `from` resolve to the snapshot stored for `to`
    ///
    /// The returned document carries `to` as its final URL, like an HTTP
    /// redirect would.
    pub fn insert_redirect(&mut self, from: &str, to: &str) -> UrlResult<()> {
        let key = normalize_url(from)?;
        let target = normalize_url(to)?;
        self.snapshots
            .insert(key.to_string(), Snapshot::Redirect(target));
        Ok(())
    }

    /// Makes fetches of `url` fail with `error`
    pub fn insert_failure(&mut self, url: &str, error: FetchError) -> UrlResult<()> {
        let key = normalize_url(url)?;
        self.snapshots
            .insert(key.to_string(), Snapshot::Failure(error));
        Ok(())
    }

    /// Delays every response, simulating network latency
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = Some(delay);
    }

    /// URLs requested so far, in call order
    pub fn fetched_urls(&self) -> Vec<Url> {
        self.fetch_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of fetch calls so far
    pub fn fetch_count(&self) -> usize {
        self.fetch_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn lookup(&self, url: &Url) -> Result<RenderedDocument, FetchError> {
        match self.snapshots.get(url.as_str()) {
            Some(Snapshot::Page(html)) => Ok(RenderedDocument::new(url.clone(), html.clone())),
            Some(Snapshot::Redirect(target)) => match self.snapshots.get(target.as_str()) {
                Some(Snapshot::Page(html)) => {
                    Ok(RenderedDocument::new(target.clone(), html.clone()))
                }
                Some(Snapshot::Failure(error)) => Err(error.clone()),
                _ => Err(FetchError::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                }),
            },
            Some(Snapshot::Failure(error)) => Err(error.clone()),
            None => Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

#[async_trait]
impl Fetcher for SnapshotFetcher {
    async fn fetch(&self, url: &Url) -> Result<RenderedDocument, FetchError> {
        self.fetch_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.lookup(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_stored_page() {
        let mut fetcher = SnapshotFetcher::new();
        fetcher
            .insert_page("http://example.test", "<p>home</p>")
            .unwrap();

        let url = Url::parse("http://example.test/").unwrap();
        let doc = fetcher.fetch(&url).await.unwrap();

        assert_eq!(doc.url, url);
        assert_eq!(doc.html, "<p>home</p>");
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_page_is_404() {
        let fetcher = SnapshotFetcher::new();
        let url = Url::parse("http://example.test/nope").unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();

        assert!(matches!(err, FetchError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_stored_failure() {
        let mut fetcher = SnapshotFetcher::new();
        fetcher
            .insert_failure(
                "http://example.test/slow",
                FetchError::Timeout {
                    url: "http://example.test/slow".to_string(),
                },
            )
            .unwrap();

        let url = Url::parse("http://example.test/slow").unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_redirect_reports_final_url() {
        let mut fetcher = SnapshotFetcher::new();
        fetcher.insert_page("http://example.test/new", "new").unwrap();
        fetcher
            .insert_redirect("http://example.test/old", "http://example.test/new")
            .unwrap();

        let url = Url::parse("http://example.test/old").unwrap();
        let doc = fetcher.fetch(&url).await.unwrap();

        assert_eq!(doc.url.as_str(), "http://example.test/new");
        assert_eq!(fetcher.fetched_urls(), vec![url]);
    }
}
