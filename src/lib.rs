//! Site-Context: a single-origin crawler that gathers page text into a context buffer
//!
//! This crate walks every page reachable from a seed URL on the seed's host,
//! extracts the visible text of each page, and accumulates it into an ordered
//! context string for downstream consumers. Pages are fetched through a pluggable
//! [`crawler::Fetcher`] and delivered through an optional [`output::PageObserver`].

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("Crawl engine has already finished")]
    AlreadyFinished,

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::EngineState,
        to: state::EngineState,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// URL-specific errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Reason a single page could not be fetched
///
/// Fetch errors never abort a crawl; the engine records them and moves on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Fetch of {url} blocked: {reason}")]
    Blocked { url: String, reason: String },
}

/// Coarse category of a [`FetchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FetchErrorKind {
    Timeout,
    Network,
    HttpStatus,
    Blocked,
}

impl FetchError {
    /// Returns the category of this error
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Timeout { .. } => FetchErrorKind::Timeout,
            Self::Network { .. } => FetchErrorKind::Network,
            Self::HttpStatus { .. } => FetchErrorKind::HttpStatus,
            Self::Blocked { .. } => FetchErrorKind::Blocked,
        }
    }

    /// Returns the URL the failed fetch was for
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url }
            | Self::Network { url, .. }
            | Self::HttpStatus { url, .. }
            | Self::Blocked { url, .. } => url,
        }
    }
}

impl FetchErrorKind {
    /// Short label used in logs and statistics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::HttpStatus => "http-status",
            Self::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{start_crawl, CrawlEngine, CrawlResult, Fetcher, HttpFetcher, RenderedDocument};
pub use output::{ContextAccumulator, CrawlStats, PageObserver, PageRecord};
pub use state::EngineState;
pub use crate::url::{normalize_seed, normalize_url, resolve_link};
