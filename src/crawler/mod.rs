//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The fetcher contract and its HTTP, snapshot and WebDriver backends
//! - Text extraction and link discovery
//! - The visited set and the shared frontier
//! - The crawl engine that coordinates a pool of fetch workers

mod coordinator;
mod extract;
mod fetcher;
mod frontier;
mod snapshot;
mod visited;
#[cfg(feature = "webdriver")]
mod webdriver;

pub use coordinator::{start_crawl, CrawlEngine, CrawlResult};
pub use extract::{extract_links, extract_page, extract_text, DiscoveredLinks, ExtractedPage};
pub use fetcher::{build_http_client, Fetcher, HttpFetcher, RenderedDocument};
pub use frontier::{CrawlTarget, Frontier, FrontierLease};
pub use snapshot::SnapshotFetcher;
pub use visited::VisitedSet;
#[cfg(feature = "webdriver")]
pub use webdriver::WebDriverFetcher;
