//! Configuration module
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key is optional; an absent file means [`Config::default`].
//!
//! # Example
//!
//! ```no_run
//! use site_context::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("site-context.toml")).unwrap();
//! println!("Fetch timeout: {}s", config.fetcher.timeout_secs);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{Config, CrawlerConfig, FetcherConfig, WebDriverConfig};

pub use parser::{load_config, parse_config};
pub use validation::{validate, MAX_CONCURRENCY, MAX_REDIRECTS};
