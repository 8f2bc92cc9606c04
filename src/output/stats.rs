//! Crawl statistics
//!
//! Counters collected while a crawl runs, and a printer for the summary the
//! command-line tool shows when a crawl finishes.

use crate::FetchErrorKind;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlStats {
    /// Number of fetches dispatched
    pub fetches_dispatched: u64,

    /// Number of page records added to the context
    pub pages_recorded: u64,

    /// Failed fetches by category
    pub fetch_failures: BTreeMap<FetchErrorKind, u64>,

    /// Links discarded for pointing at a different host
    pub offsite_links: u64,

    /// Links discarded because they could not be normalized
    pub invalid_links: u64,

    /// Pages dropped because they redirected to an already visited URL
    pub duplicate_redirects: u64,

    /// Whether the crawl was stopped by a cancellation signal
    pub cancelled: bool,

    /// Wall-clock duration of the crawl
    pub elapsed: Duration,
}

impl CrawlStats {
    /// Total number of failed fetches
    pub fn total_failures(&self) -> u64 {
        self.fetch_failures.values().sum()
    }

    /// Returns the success rate as a percentage of dispatched fetches
    pub fn success_rate(&self) -> f64 {
        if self.fetches_dispatched == 0 {
            return 0.0;
        }
        (self.pages_recorded as f64 / self.fetches_dispatched as f64) * 100.0
    }
}

/// Shared, lock-protected statistics recorder used by crawl workers
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    inner: Mutex<CrawlStats>,
}

impl StatsRecorder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn update(&self, f: impl FnOnce(&mut CrawlStats)) {
        let mut stats = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut stats);
    }

    pub(crate) fn record_dispatch(&self) {
        self.update(|s| s.fetches_dispatched += 1);
    }

    /// Returns the number of pages recorded so far
    pub(crate) fn record_page(&self) -> u64 {
        let mut stats = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        stats.pages_recorded += 1;
        stats.pages_recorded
    }

    pub(crate) fn record_fetch_error(&self, kind: FetchErrorKind) {
        self.update(|s| *s.fetch_failures.entry(kind).or_insert(0) += 1);
    }

    pub(crate) fn record_discarded_links(&self, offsite: u64, invalid: u64) {
        self.update(|s| {
            s.offsite_links += offsite;
            s.invalid_links += invalid;
        });
    }

    pub(crate) fn record_duplicate_redirect(&self) {
        self.update(|s| s.duplicate_redirects += 1);
    }

    /// Returns the final statistics
    pub(crate) fn finish(&self, cancelled: bool, elapsed: Duration) -> CrawlStats {
        let mut stats = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        stats.cancelled = cancelled;
        stats.elapsed = elapsed;
        stats.clone()
    }
}

/// Prints statistics to stderr in a formatted manner
///
/// The context itself goes to stdout, so the summary is kept out of it.
pub fn print_statistics(stats: &CrawlStats) {
    eprintln!("=== Crawl Statistics ===\n");

    eprintln!("Overview:");
    eprintln!("  Fetches dispatched: {}", stats.fetches_dispatched);
    eprintln!("  Pages added to context: {}", stats.pages_recorded);
    eprintln!("  Elapsed: {:.2}s", stats.elapsed.as_secs_f64());
    if stats.cancelled {
        eprintln!("  Crawl was cancelled before the frontier was exhausted");
    }
    eprintln!();

    eprintln!("Discarded Links:");
    eprintln!("  Off-site: {}", stats.offsite_links);
    eprintln!("  Invalid: {}", stats.invalid_links);
    eprintln!("  Duplicate redirects: {}", stats.duplicate_redirects);
    eprintln!();

    if !stats.fetch_failures.is_empty() {
        eprintln!("Fetch Failures:");
        let mut failure_counts: Vec<_> = stats.fetch_failures.iter().collect();
        failure_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (kind, count) in failure_counts {
            eprintln!("  {}: {}", kind, count);
        }
        eprintln!();
    }

    eprintln!(
        "Success Rate: {:.1}% ({} / {} fetches added to context)",
        stats.success_rate(),
        stats.pages_recorded,
        stats.fetches_dispatched
    );
}
