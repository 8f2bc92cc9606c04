//! Page record type and the observer interface
//!
//! Every successfully processed page becomes one [`PageRecord`]. Records are
//! delivered to the context accumulator and, when one is registered, to a
//! caller-supplied [`PageObserver`].

use url::Url;

/// Text extracted from one successfully fetched, in-domain page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    /// The page URL (final URL after redirects)
    pub url: Url,

    /// Visible text, one trimmed text node per line
    pub text: String,

    /// Order in which the page's target was enqueued; the seed is 0
    pub sequence: u64,
}

impl PageRecord {
    /// Creates a new page record
    pub fn new(url: Url, text: String, sequence: u64) -> Self {
        Self {
            url,
            text,
            sequence,
        }
    }
}

/// Receives page records as the crawl produces them
///
/// Observer calls are serialized by the engine, so an observer sees records in
/// the same order the context accumulator stores them. Implementations must be
/// thread-safe because the calling worker varies.
pub trait PageObserver: Send + Sync {
    /// Called exactly once per page record
    ///
    /// # Arguments
    ///
    /// * `record` - The record about to be added to the context
    fn on_page(&self, record: &PageRecord);
}

impl<F> PageObserver for F
where
    F: Fn(&PageRecord) + Send + Sync,
{
    fn on_page(&self, record: &PageRecord) {
        self(record)
    }
}
