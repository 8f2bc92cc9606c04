//! Visited set shared by all fetch workers of one crawl

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use url::Url;

/// Set of normalized URLs already dispatched (or about to be) for fetching
///
/// The set only grows. [`VisitedSet::try_mark`] is a single check-and-set
/// under one lock, so concurrent callers can never both win the same URL.
#[derive(Debug, Default)]
pub struct VisitedSet {
    seen: Mutex<HashSet<String>>,
}

impl VisitedSet {
    /// Creates an empty visited set
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the URL if absent
    ///
    /// # Returns
    ///
    /// * `true` - The URL was not present and is now marked
    /// * `false` - The URL had already been marked
    pub fn try_mark(&self, url: &Url) -> bool {
        self.lock().insert(url.as_str().to_string())
    }

    /// Returns true if the URL has been marked
    pub fn contains(&self, url: &Url) -> bool {
        self.lock().contains(url.as_str())
    }

    /// Number of marked URLs
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing has been marked
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
