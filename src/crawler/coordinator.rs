//! Crawl engine - main crawl orchestration logic
//!
//! This module contains the worker pool that drives a crawl from its seed to
//! completion, including:
//! - Seed normalization and the engine state machine
//! - Dispatching frontier targets to the fetcher
//! - Text and link extraction, domain filtering and visited-set checks
//! - Delivering page records to the observer and the context accumulator
//! - Cancellation and statistics

use crate::crawler::extract::extract_page;
use crate::crawler::fetcher::{Fetcher, RenderedDocument};
use crate::crawler::frontier::{CrawlTarget, Frontier};
use crate::crawler::visited::VisitedSet;
use crate::output::stats::StatsRecorder;
use crate::output::{ContextAccumulator, CrawlStats, PageObserver, PageRecord};
use crate::state::EngineState;
use crate::url::{extract_host, is_same_host, normalize_seed, normalize_url};
use crate::{CrawlerError, FetchError, Result, UrlError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Output of a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlResult {
    /// Accumulated page records
    pub context: Arc<ContextAccumulator>,

    /// Counters collected during the crawl
    pub stats: CrawlStats,
}

impl CrawlResult {
    /// The concatenated context string
    pub fn get_context(&self) -> String {
        self.context.get_context()
    }
}

/// Crawls a site starting from `seed` with a single fetch worker
///
/// `on_page` is called once per page record, in delivery order, before the
/// record is added to the returned context.
///
/// # Example
///
/// ```no_run
/// use site_context::config::FetcherConfig;
/// use site_context::{start_crawl, HttpFetcher, PageObserver, PageRecord};
/// use std::sync::Arc;
///
/// # async fn run() -> site_context::Result<()> {
/// let fetcher = Arc::new(HttpFetcher::new(&FetcherConfig::default())?);
/// let on_page: Arc<dyn PageObserver> =
///     Arc::new(|record: &PageRecord| println!("Added {}", record.url));
///
/// let result = start_crawl("example.test", fetcher, Some(on_page)).await?;
/// println!("{}", result.get_context());
/// # Ok(())
/// # }
/// ```
pub async fn start_crawl(
    seed: &str,
    fetcher: Arc<dyn Fetcher>,
    on_page: Option<Arc<dyn PageObserver>>,
) -> Result<CrawlResult> {
    let mut engine = CrawlEngine::new(fetcher);
    if let Some(observer) = on_page {
        engine = engine.with_observer(observer);
    }

    let stats = engine.start(seed).await?;

    Ok(CrawlResult {
        context: engine.accumulator(),
        stats,
    })
}

/// Crawl engine for a single crawl
///
/// An engine runs at most once: `Idle -> Running -> Draining -> Done`. A
/// second [`CrawlEngine::start`] on a finished engine fails with
/// [`CrawlerError::AlreadyFinished`].
pub struct CrawlEngine {
    fetcher: Arc<dyn Fetcher>,
    observer: Option<Arc<dyn PageObserver>>,
    accumulator: Arc<ContextAccumulator>,
    concurrency: usize,
    cancel: CancellationToken,
    state: Mutex<EngineState>,
}

/// State shared by the workers of one crawl
struct CrawlContext {
    fetcher: Arc<dyn Fetcher>,
    observer: Option<Arc<dyn PageObserver>>,
    accumulator: Arc<ContextAccumulator>,
    visited: VisitedSet,
    frontier: Frontier,
    stats: StatsRecorder,
    host: String,
    started: Instant,
    // Keeps observer calls and accumulator appends in the same order
    delivery: Mutex<()>,
}

impl CrawlEngine {
    /// Creates an idle engine with one worker and a fresh accumulator
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            observer: None,
            accumulator: Arc::new(ContextAccumulator::new()),
            concurrency: 1,
            cancel: CancellationToken::new(),
            state: Mutex::new(EngineState::Idle),
        }
    }

    /// Sets the number of concurrent fetch workers (at least 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Registers the per-page callback
    pub fn with_observer(mut self, observer: Arc<dyn PageObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Accumulates into an existing accumulator instead of a fresh one
    pub fn with_accumulator(mut self, accumulator: Arc<ContextAccumulator>) -> Self {
        self.accumulator = accumulator;
        self
    }

    /// Uses an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Current engine state
    pub fn state(&self) -> EngineState {
        *self.lock_state()
    }

    /// Token that cancels this engine's crawl when raised
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The accumulator receiving page records
    pub fn accumulator(&self) -> Arc<ContextAccumulator> {
        Arc::clone(&self.accumulator)
    }

    /// Runs the crawl to completion
    ///
    /// # Arguments
    ///
    /// * `seed` - Start URL; `http://` is assumed when no scheme is given
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlStats)` - The crawl finished (possibly cancelled)
    /// * `Err(CrawlerError::InvalidUrl)` - The seed could not be normalized;
    ///   the engine stays idle
    /// * `Err(CrawlerError::AlreadyFinished)` - The engine already ran
    pub async fn start(&self, seed: &str) -> Result<CrawlStats> {
        if self.state().is_terminal() {
            return Err(CrawlerError::AlreadyFinished);
        }

        let seed = normalize_seed(seed)?;
        let host = extract_host(&seed).ok_or_else(|| UrlError::MissingHost(seed.to_string()))?;

        self.transition(EngineState::Running)?;
        tracing::info!(
            "Starting crawl of {} with {} worker(s)",
            seed,
            self.concurrency
        );

        let ctx = Arc::new(CrawlContext {
            fetcher: Arc::clone(&self.fetcher),
            observer: self.observer.clone(),
            accumulator: Arc::clone(&self.accumulator),
            visited: VisitedSet::new(),
            frontier: Frontier::new(),
            stats: StatsRecorder::new(),
            host,
            started: Instant::now(),
            delivery: Mutex::new(()),
        });

        ctx.visited.try_mark(&seed);
        ctx.frontier.push(seed);

        let mut workers = JoinSet::new();
        for worker_id in 0..self.concurrency {
            workers.spawn(run_worker(Arc::clone(&ctx), worker_id));
        }

        let cancelled = tokio::select! {
            biased;
            _ = ctx.frontier.closed() => false,
            _ = self.cancel.cancelled() => {
                let discarded = ctx.frontier.close();
                tracing::info!(
                    "Crawl cancelled, discarded {} queued URL(s); waiting for in-flight fetches",
                    discarded
                );
                true
            }
        };

        self.transition(EngineState::Draining)?;

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Crawl worker terminated abnormally: {}", e);
            }
        }

        self.transition(EngineState::Done)?;

        let stats = ctx.stats.finish(cancelled, ctx.started.elapsed());
        tracing::info!(
            "Crawl completed: {} pages added to context in {:?}",
            stats.pages_recorded,
            stats.elapsed
        );

        Ok(stats)
    }

    fn transition(&self, next: EngineState) -> Result<()> {
        let mut state = self.lock_state();

        if state.is_terminal() {
            return Err(CrawlerError::AlreadyFinished);
        }
        if !state.can_transition_to(next) {
            return Err(CrawlerError::InvalidTransition {
                from: *state,
                to: next,
            });
        }

        tracing::debug!("Crawl engine {} -> {}", *state, next);
        *state = next;
        Ok(())
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Pulls targets until the frontier closes
///
/// Each target is processed on its own task so a panicking observer loses
/// one page instead of the worker.
async fn run_worker(ctx: Arc<CrawlContext>, worker_id: usize) {
    while let Some(lease) = ctx.frontier.next().await {
        let target = lease.target().clone();
        let url = target.url.clone();

        let task = tokio::spawn(process_target(Arc::clone(&ctx), target));
        if let Err(e) = task.await {
            tracing::error!("Worker {} failed while processing {}: {}", worker_id, url, e);
        }

        drop(lease);
    }

    tracing::debug!("Worker {} finished", worker_id);
}

/// Fetches one target and handles the result
///
/// This method:
/// 1. Fetches the page
/// 2. Resolves redirects against the visited set
/// 3. Extracts text and links
/// 4. Delivers the page record
/// 5. Queues newly discovered in-domain links
async fn process_target(ctx: Arc<CrawlContext>, target: CrawlTarget) {
    ctx.stats.record_dispatch();
    tracing::debug!("Fetching {} (#{})", target.url, target.sequence);

    let doc = match ctx.fetcher.fetch(&target.url).await {
        Ok(doc) => doc,
        Err(e) => {
            report_fetch_error(&ctx, e);
            return;
        }
    };

    let doc = match settle_final_url(&ctx, &target, doc) {
        Ok(Some(doc)) => doc,
        Ok(None) => return,
        Err(e) => {
            report_fetch_error(&ctx, e);
            return;
        }
    };

    let page = extract_page(&doc, &ctx.host);
    let record = PageRecord::new(doc.url, page.text, target.sequence);
    deliver(&ctx, record);

    ctx.stats
        .record_discarded_links(page.links.offsite, page.links.invalid);

    let mut queued = 0usize;
    for link in page.links.links {
        if ctx.visited.try_mark(&link) {
            if ctx.frontier.push(link) {
                queued += 1;
            }
        } else {
            tracing::trace!("Already visited {}", link);
        }
    }

    if queued > 0 {
        tracing::debug!("Queued {} new link(s) from {}", queued, target.url);
    }
}

/// Checks a fetched document's final URL against the target
///
/// # Returns
///
/// * `Ok(Some(doc))` - The document to process, keyed by its normalized final URL
/// * `Ok(None)` - A redirect landed on an already visited page
/// * `Err(FetchError::Blocked)` - The final URL is unusable or off-site
fn settle_final_url(
    ctx: &CrawlContext,
    target: &CrawlTarget,
    doc: RenderedDocument,
) -> std::result::Result<Option<RenderedDocument>, FetchError> {
    let final_url = normalize_url(doc.url.as_str()).map_err(|e| FetchError::Blocked {
        url: target.url.to_string(),
        reason: e.to_string(),
    })?;

    if final_url == target.url {
        return Ok(Some(RenderedDocument::new(final_url, doc.html)));
    }

    if !is_same_host(&final_url, &ctx.host) {
        return Err(FetchError::Blocked {
            url: target.url.to_string(),
            reason: format!("redirected off-site to {}", final_url),
        });
    }

    if !ctx.visited.try_mark(&final_url) {
        tracing::debug!(
            "{} redirected to already visited {}, skipping",
            target.url,
            final_url
        );
        ctx.stats.record_duplicate_redirect();
        return Ok(None);
    }

    Ok(Some(RenderedDocument::new(final_url, doc.html)))
}

fn report_fetch_error(ctx: &CrawlContext, e: FetchError) {
    tracing::warn!("Failed to fetch {} ({}): {}", e.url(), e.kind(), e);
    ctx.stats.record_fetch_error(e.kind());
}

fn deliver(ctx: &CrawlContext, record: PageRecord) {
    let _guard = ctx.delivery.lock().unwrap_or_else(PoisonError::into_inner);

    if let Some(observer) = &ctx.observer {
        observer.on_page(&record);
    }

    tracing::info!("Added {} to context", record.url);
    ctx.accumulator.add(record);

    let pages = ctx.stats.record_page();
    if pages % 10 == 0 {
        let elapsed = ctx.started.elapsed().as_secs_f64();
        tracing::info!(
            "Progress: {} pages added, {} in frontier, {:.2} pages/sec",
            pages,
            ctx.frontier.pending(),
            pages as f64 / elapsed
        );
    }
}
