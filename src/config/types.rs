use serde::Deserialize;

/// Main configuration structure
///
/// Every section is optional in the TOML file; missing keys take the defaults
/// below.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub fetcher: FetcherConfig,
    pub webdriver: WebDriverConfig,
}

/// Crawl engine configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of concurrent fetch workers
    pub concurrency: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

/// HTTP fetcher configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetcherConfig {
    /// Total request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Maximum number of redirects followed per request
    #[serde(rename = "max-redirects")]
    pub max_redirects: usize,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_redirects: 10,
            user_agent: format!("site-context/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// WebDriver rendering configuration (used by the `webdriver` feature)
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct WebDriverConfig {
    /// WebDriver server endpoint
    pub url: String,

    /// CSS selector that must be present before a page counts as rendered
    #[serde(rename = "ready-selector")]
    pub ready_selector: String,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:4444".to_string(),
            ready_selector: "body".to_string(),
        }
    }
}
