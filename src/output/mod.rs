//! Output module for delivering crawl results
//!
//! This module handles:
//! - The page record type and the observer interface for callers
//! - Accumulating page texts into a single context string
//! - Recording crawl statistics

mod accumulator;
pub mod stats;
mod traits;

pub use accumulator::{ContextAccumulator, CONTEXT_SEPARATOR};
pub use stats::{print_statistics, CrawlStats};
pub use traits::{PageObserver, PageRecord};
