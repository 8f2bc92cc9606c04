//! WebDriver-backed rendering fetcher
//!
//! Drives a real browser through a WebDriver server (geckodriver, chromedriver,
//! selenium) so pages that build their content with JavaScript can be crawled.
//! A page counts as fetched once the configured readiness selector matches.

use crate::config::WebDriverConfig;
use crate::crawler::fetcher::{Fetcher, RenderedDocument};
use crate::url::is_same_host;
use crate::FetchError;
use async_trait::async_trait;
use fantoccini::error::{CmdError, NewSessionError};
use fantoccini::{Client, ClientBuilder, Locator};
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

/// Fetcher that renders pages in a WebDriver session
///
/// A session has a single active tab, so navigation is serialized; running the
/// crawl with more workers than sessions gives no extra throughput.
pub struct WebDriverFetcher {
    client: Mutex<Client>,
    ready_selector: String,
    timeout: Duration,
}

impl WebDriverFetcher {
    /// Opens a session on the WebDriver server named in `config`
    pub async fn connect(config: &WebDriverConfig, timeout: Duration) -> Result<Self, NewSessionError> {
        let client = ClientBuilder::native().connect(&config.url).await?;
        tracing::debug!("Connected to WebDriver at {}", config.url);

        Ok(Self {
            client: Mutex::new(client),
            ready_selector: config.ready_selector.clone(),
            timeout,
        })
    }

    /// Ends the browser session; later fetches fail with a network error
    pub async fn close(&self) -> Result<(), CmdError> {
        let client = self.client.lock().await.clone();
        client.close().await
    }

    async fn render(&self, client: &Client, url: &Url) -> Result<RenderedDocument, FetchError> {
        client
            .goto(url.as_str())
            .await
            .map_err(|e| classify_error(url, e))?;

        client
            .wait()
            .at_most(self.timeout)
            .for_element(Locator::Css(&self.ready_selector))
            .await
            .map_err(|e| classify_error(url, e))?;

        let final_url = client
            .current_url()
            .await
            .map_err(|e| classify_error(url, e))?;

        if let Some(host) = url.host_str() {
            if !is_same_host(&final_url, host) {
                return Err(FetchError::Blocked {
                    url: url.to_string(),
                    reason: format!("redirected off-site to {}", final_url),
                });
            }
        }

        let html = client.source().await.map_err(|e| classify_error(url, e))?;

        Ok(RenderedDocument::new(final_url, html))
    }
}

#[async_trait]
impl Fetcher for WebDriverFetcher {
    async fn fetch(&self, url: &Url) -> Result<RenderedDocument, FetchError> {
        let client = self.client.lock().await;

        // goto has no timeout of its own
        match tokio::time::timeout(self.timeout * 2, self.render(&client, url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
            }),
        }
    }
}

fn classify_error(url: &Url, e: CmdError) -> FetchError {
    match e {
        CmdError::WaitTimeout => FetchError::Timeout {
            url: url.to_string(),
        },
        other => FetchError::Network {
            url: url.to_string(),
            message: other.to_string(),
        },
    }
}
