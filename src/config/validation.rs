use crate::config::types::{Config, CrawlerConfig, FetcherConfig, WebDriverConfig};
use crate::{ConfigError, ConfigResult};
use scraper::Selector;
use url::Url;

/// Upper bound on concurrent fetch workers
pub const MAX_CONCURRENCY: usize = 64;

/// Upper bound on redirects followed per request
pub const MAX_REDIRECTS: usize = 20;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_crawler_config(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_webdriver_config(&config.webdriver)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    if config.concurrency < 1 || config.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.concurrency
        )));
    }

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> ConfigResult<()> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect-timeout-secs must be >= 1, got {}",
            config.connect_timeout_secs
        )));
    }

    if config.max_redirects > MAX_REDIRECTS {
        return Err(ConfigError::Validation(format!(
            "max-redirects must be <= {}, got {}",
            MAX_REDIRECTS, config.max_redirects
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates WebDriver configuration
fn validate_webdriver_config(config: &WebDriverConfig) -> ConfigResult<()> {
    let url = Url::parse(&config.url).map_err(|e| {
        ConfigError::Validation(format!("webdriver url '{}' is invalid: {}", config.url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "webdriver url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if Selector::parse(&config.ready_selector).is_err() {
        return Err(ConfigError::Validation(format!(
            "ready-selector '{}' is not a valid CSS selector",
            config.ready_selector
        )));
    }

    Ok(())
}
