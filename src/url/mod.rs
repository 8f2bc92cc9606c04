//! URL handling module
//!
//! This module provides seed normalization (scheme inference), link resolution,
//! and the host comparison that keeps a crawl on its seed's origin.

mod domain;
mod normalize;

pub use domain::{extract_host, is_same_host};
pub use normalize::{normalize_seed, normalize_url, resolve_link};
