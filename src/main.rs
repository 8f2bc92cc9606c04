//! site-context main entry point
//!
//! This is the command-line interface for the site-context crawler.

use anyhow::Context;
use clap::Parser;
use site_context::config::{load_config, validate, Config};
use site_context::crawler::{CrawlEngine, Fetcher, HttpFetcher};
use site_context::output::print_statistics;
use site_context::url::{extract_host, normalize_seed};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use url::Url;

/// site-context: build a text context from a single website
///
/// Crawls every page reachable from the seed URL on the seed's host, extracts
/// the visible text of each page and writes the combined text to stdout (or
/// to --output). Logs and statistics go to stderr.
#[derive(Parser, Debug)]
#[command(name = "site-context")]
#[command(version)]
#[command(about = "Crawl one website into a plain-text context", long_about = None)]
struct Cli {
    /// Seed URL; http:// is assumed when no scheme is given
    #[arg(value_name = "URL")]
    url: String,

    /// Number of concurrent fetch workers
    #[arg(short, long, value_name = "N")]
    concurrency: Option<usize>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Write the context to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Render pages through the configured WebDriver server
    #[cfg(feature = "webdriver")]
    #[arg(long)]
    render: bool,

    /// Validate the seed and configuration without crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_context=info,warn"),
            1 => EnvFilter::new("site_context=debug,info"),
            2 => EnvFilter::new("site_context=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = effective_config(&cli)?;

    let seed = normalize_seed(&cli.url).with_context(|| format!("Invalid seed URL '{}'", cli.url))?;

    if cli.dry_run {
        handle_dry_run(&seed, &config);
        return Ok(());
    }

    handle_crawl(&cli, config, seed).await
}

/// Loads the configuration file (if any) and applies command-line overrides
fn effective_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(concurrency) = cli.concurrency {
        config.crawler.concurrency = concurrency;
    }
    if let Some(timeout) = cli.timeout {
        config.fetcher.timeout_secs = timeout;
    }

    validate(&config).context("Invalid configuration")?;

    Ok(config)
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(seed: &Url, config: &Config) {
    println!("=== site-context Dry Run ===\n");

    println!("Seed:");
    println!("  URL: {}", seed);
    println!("  Host: {}", extract_host(seed).unwrap_or_default());

    println!("\nCrawler Configuration:");
    println!("  Concurrency: {}", config.crawler.concurrency);

    println!("\nFetcher:");
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    println!("  Connect timeout: {}s", config.fetcher.connect_timeout_secs);
    println!("  Max redirects: {}", config.fetcher.max_redirects);
    println!("  User agent: {}", config.fetcher.user_agent);

    #[cfg(feature = "webdriver")]
    {
        println!("\nWebDriver:");
        println!("  URL: {}", config.webdriver.url);
        println!("  Ready selector: {}", config.webdriver.ready_selector);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(cli: &Cli, config: Config, seed: Url) -> anyhow::Result<()> {
    let backend = build_backend(cli, &config).await?;

    let engine =
        CrawlEngine::new(Arc::clone(&backend.fetcher)).with_concurrency(config.crawler.concurrency);

    let cancel = engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight fetches");
            cancel.cancel();
        }
    });

    let crawled = engine.start(seed.as_str()).await;
    backend.shutdown().await;
    let stats = crawled?;
    let context = engine.accumulator().get_context();

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &context)
                .with_context(|| format!("Failed to write context to {}", path.display()))?;
            tracing::info!("Context written to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", context).context("Failed to write context to stdout")?;
        }
    }

    if !cli.quiet {
        eprintln!();
        print_statistics(&stats);
    }

    Ok(())
}

/// The fetcher used for a crawl, plus the browser session behind it if any
struct Backend {
    fetcher: Arc<dyn Fetcher>,
    #[cfg(feature = "webdriver")]
    session: Option<Arc<site_context::crawler::WebDriverFetcher>>,
}

impl Backend {
    async fn shutdown(&self) {
        #[cfg(feature = "webdriver")]
        if let Some(session) = &self.session {
            if let Err(e) = session.close().await {
                tracing::warn!("Failed to close WebDriver session: {}", e);
            }
        }
    }
}

#[cfg(not(feature = "webdriver"))]
async fn build_backend(_cli: &Cli, config: &Config) -> anyhow::Result<Backend> {
    let fetcher = HttpFetcher::new(&config.fetcher).context("Failed to build HTTP client")?;
    Ok(Backend {
        fetcher: Arc::new(fetcher),
    })
}

#[cfg(feature = "webdriver")]
async fn build_backend(cli: &Cli, config: &Config) -> anyhow::Result<Backend> {
    use site_context::crawler::WebDriverFetcher;
    use std::time::Duration;

    if !cli.render {
        let fetcher = HttpFetcher::new(&config.fetcher).context("Failed to build HTTP client")?;
        return Ok(Backend {
            fetcher: Arc::new(fetcher),
            session: None,
        });
    }

    let timeout = Duration::from_secs(config.fetcher.timeout_secs);
    let session = WebDriverFetcher::connect(&config.webdriver, timeout)
        .await
        .with_context(|| format!("Failed to connect to WebDriver at {}", config.webdriver.url))?;
    let session = Arc::new(session);

    Ok(Backend {
        fetcher: Arc::clone(&session) as Arc<dyn Fetcher>,
        session: Some(session),
    })
}
