use crate::output::traits::PageRecord;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Separator placed between page texts in the exported context
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Ordered, thread-safe collection of page texts
///
/// Records are kept in the order `add` was called. Under concurrent fetching
/// that is completion order, not discovery order; use [`PageRecord::sequence`]
/// to recover the latter.
#[derive(Debug, Default)]
pub struct ContextAccumulator {
    records: Mutex<Vec<PageRecord>>,
}

impl ContextAccumulator {
    /// Creates an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a page record to the buffer
    pub fn add(&self, record: PageRecord) {
        self.lock().push(record);
    }

    /// Returns all page texts joined by a blank line
    ///
    /// Safe to call mid-crawl; the result is a consistent snapshot of every
    /// record added so far.
    pub fn get_context(&self) -> String {
        let records = self.lock();
        let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
        texts.join(CONTEXT_SEPARATOR)
    }

    /// Returns a copy of the records in delivery order
    pub fn records(&self) -> Vec<PageRecord> {
        self.lock().clone()
    }

    /// Number of records added so far
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no record has been added
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PageRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
