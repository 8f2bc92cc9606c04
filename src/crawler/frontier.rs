//! Frontier queue shared by the fetch workers
//!
//! This module handles:
//! - FIFO storage of discovered targets awaiting dispatch
//! - Accounting of fetches currently in flight
//! - Detecting when the crawl has drained (nothing queued, nothing in flight)
//! - Closing early when a crawl is cancelled

use std::collections::VecDeque;
use std::pin::pin;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use url::Url;

/// A URL waiting in the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    /// The normalized URL to fetch
    pub url: Url,

    /// Enqueue order; the seed is 0
    pub sequence: u64,
}

#[derive(Debug, Default)]
struct FrontierQueue {
    pending: VecDeque<CrawlTarget>,
    in_flight: usize,
    next_sequence: u64,
    closed: bool,
}

/// Concurrency-safe crawl frontier
///
/// Workers call [`Frontier::next`] to take a target. The returned lease counts
/// as in flight until it is dropped, and new targets discovered while handling
/// it must be pushed before the lease goes away. Once the queue is empty with
/// nothing in flight the frontier closes itself and every waiting worker
/// receives `None`.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: Mutex<FrontierQueue>,
    notify: Notify,
}

/// A target taken from the frontier; completes the fetch when dropped
#[derive(Debug)]
pub struct FrontierLease<'a> {
    frontier: &'a Frontier,
    target: CrawlTarget,
}

impl FrontierLease<'_> {
    /// The leased target
    pub fn target(&self) -> &CrawlTarget {
        &self.target
    }
}

impl Drop for FrontierLease<'_> {
    fn drop(&mut self) {
        self.frontier.complete();
    }
}

impl Frontier {
    /// Creates an empty, open frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a URL to the back of the queue
    ///
    /// Callers are expected to have claimed the URL in the visited set first;
    /// the frontier itself does not deduplicate.
    ///
    /// # Returns
    ///
    /// * `true` - The URL was queued
    /// * `false` - The frontier is closed and the URL was dropped
    pub fn push(&self, url: Url) -> bool {
        {
            let mut queue = self.lock();
            if queue.closed {
                return false;
            }
            let sequence = queue.next_sequence;
            queue.next_sequence += 1;
            queue.pending.push_back(CrawlTarget { url, sequence });
        }
        self.notify.notify_waiters();
        true
    }

    /// Waits for the next target
    ///
    /// # Returns
    ///
    /// * `Some(FrontierLease)` - A target to fetch
    /// * `None` - The frontier is closed, either drained or cancelled
    pub async fn next(&self) -> Option<FrontierLease<'_>> {
        loop {
            let mut notified = pin!(self.notify.notified());
            notified.as_mut().enable();

            {
                let mut queue = self.lock();
                if queue.closed {
                    return None;
                }

                if let Some(target) = queue.pending.pop_front() {
                    queue.in_flight += 1;
                    return Some(FrontierLease {
                        frontier: self,
                        target,
                    });
                }

                if queue.in_flight == 0 {
                    queue.closed = true;
                    drop(queue);
                    tracing::debug!("Frontier drained");
                    self.notify.notify_waiters();
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Waits until the frontier has closed
    pub async fn closed(&self) {
        loop {
            let mut notified = pin!(self.notify.notified());
            notified.as_mut().enable();

            if self.lock().closed {
                return;
            }

            notified.await;
        }
    }

    /// Closes the frontier, discarding queued targets
    ///
    /// In-flight leases stay valid; later pushes are rejected.
    ///
    /// # Returns
    ///
    /// The number of queued targets that were discarded
    pub fn close(&self) -> usize {
        let discarded = {
            let mut queue = self.lock();
            queue.closed = true;
            let discarded = queue.pending.len();
            queue.pending.clear();
            discarded
        };
        self.notify.notify_waiters();
        discarded
    }

    /// Returns true once the frontier has closed
    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of targets waiting for dispatch
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Number of leases currently outstanding
    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    fn complete(&self) {
        {
            let mut queue = self.lock();
            queue.in_flight = queue.in_flight.saturating_sub(1);
        }
        self.notify.notify_waiters();
    }

    fn lock(&self) -> MutexGuard<'_, FrontierQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
