//! Text and link extraction for rendered documents
//!
//! This module handles:
//! - Visible text extraction (body text nodes outside `<script>`/`<style>`)
//! - Link discovery from `<a>` and `<area>` tags
//! - Domain filtering of discovered links against the crawl's host
//!
//! Everything here is synchronous. `scraper::Html` is not `Send`, so a parsed
//! document must never be held across an `.await`.

use crate::crawler::fetcher::RenderedDocument;
use crate::url::{is_same_host, resolve_link};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// File extensions that are never worth fetching as pages
const IGNORED_EXTENSIONS: &[&str] = &[
    // archives
    "7z", "7zip", "bz2", "gz", "rar", "tar", "tgz", "xz", "zip",
    // images
    "ai", "bmp", "cdr", "drw", "dxf", "eps", "gif", "ico", "jpeg", "jpg", "mng", "pct", "png",
    "ps", "psd", "psp", "svg", "tif", "tiff", "webp",
    // audio
    "aac", "aiff", "au", "m4a", "mid", "mp3", "ogg", "ra", "wav", "wma",
    // video
    "3gp", "asf", "asx", "avi", "flv", "m4v", "mov", "mp4", "mpg", "qt", "rm", "swf", "webm",
    "wmv",
    // office
    "doc", "docx", "odg", "odp", "ods", "odt", "pps", "ppt", "pptx", "xls", "xlsx",
    // other
    "apk", "bin", "css", "deb", "dmg", "exe", "iso", "jar", "js", "pdf", "rss",
];

/// Links discovered on one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredLinks {
    /// In-domain, normalized links in document order, without duplicates
    pub links: Vec<Url>,

    /// Links dropped because they point at a different host
    pub offsite: u64,

    /// Links dropped because they could not be normalized
    pub invalid: u64,
}

/// Everything the crawl engine needs from one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Visible text, one trimmed text node per line
    pub text: String,

    /// Links to consider for the frontier
    pub links: DiscoveredLinks,
}

/// Extracts visible text from a rendered document
///
/// Walks the text nodes under `<body>`, skips those nested in `<script>` or
/// `<style>`, trims each one and joins the non-empty results with newlines.
/// Malformed or empty documents yield an empty string.
pub fn extract_text(doc: &RenderedDocument) -> String {
    let document = Html::parse_document(&doc.html);
    visible_text(&document)
}

/// Extracts the in-domain links of a rendered document
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` and `<area href="...">`
/// - Relative links, resolved against `<base href>` when present, otherwise
///   against `base_url`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - Fragment-only links (same page anchors)
/// - Links to binary or asset files (`.pdf`, `.png`, `.zip`, ...)
/// - Links whose host is not `allowed_host`
///
/// # Example
///
/// ```
/// use site_context::crawler::{extract_links, RenderedDocument};
/// use url::Url;
///
/// let base = Url::parse("http://example.test/").unwrap();
/// let doc = RenderedDocument::new(
///     base.clone(),
///     r#"<a href="/about">About</a><a href="http://other.test/">Other</a>"#,
/// );
/// let found = extract_links(&doc, &base, "example.test");
/// assert_eq!(found.links.len(), 1);
/// assert_eq!(found.offsite, 1);
/// ```
pub fn extract_links(doc: &RenderedDocument, base_url: &Url, allowed_host: &str) -> DiscoveredLinks {
    let document = Html::parse_document(&doc.html);
    discover_links(&document, base_url, allowed_host)
}

/// Extracts text and links with a single parse
///
/// Links are resolved against the document's own (final) URL.
pub fn extract_page(doc: &RenderedDocument, allowed_host: &str) -> ExtractedPage {
    let document = Html::parse_document(&doc.html);

    ExtractedPage {
        text: visible_text(&document),
        links: discover_links(&document, &doc.url, allowed_host),
    }
}

fn visible_text(document: &Html) -> String {
    let Ok(body_selector) = Selector::parse("body") else {
        return String::new();
    };
    let Some(body) = document.select(&body_selector).next() else {
        return String::new();
    };

    let mut lines = Vec::new();
    for node in body.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|el| matches!(el.name(), "script" | "style"))
                .unwrap_or(false)
        });
        if hidden {
            continue;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed);
        }
    }

    lines.join("\n")
}

fn discover_links(document: &Html, base_url: &Url, allowed_host: &str) -> DiscoveredLinks {
    let base = document_base(document, base_url);
    let mut found = DiscoveredLinks::default();
    let mut seen = HashSet::new();

    let Ok(selector) = Selector::parse("a[href], area[href]") else {
        return found;
    };

    for element in document.select(&selector) {
        let Some(href) = followable_href(element) else {
            continue;
        };

        let url = match resolve_link(href, &base) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Discarding link '{}' on {}: {}", href, base_url, e);
                found.invalid += 1;
                continue;
            }
        };

        if has_ignored_extension(&url) {
            continue;
        }

        if !is_same_host(&url, allowed_host) {
            tracing::trace!("Discarding off-site link {}", url);
            found.offsite += 1;
            continue;
        }

        if seen.insert(url.as_str().to_string()) {
            found.links.push(url);
        }
    }

    found
}

/// Returns the href of an element worth following, if any
fn followable_href(element: ElementRef<'_>) -> Option<&str> {
    if element.value().attr("download").is_some() {
        return None;
    }

    let href = element.value().attr("href")?.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    Some(href)
}

/// Resolves the document's `<base href>` against the page URL
fn document_base(document: &Html, page_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|el| el.value().attr("href"))
                .and_then(|href| page_url.join(href.trim()).ok())
        })
        .unwrap_or_else(|| page_url.clone())
}

fn has_ignored_extension(url: &Url) -> bool {
    let Some(segment) = url.path_segments().and_then(|mut segments| segments.next_back()) else {
        return false;
    };

    match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            IGNORED_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}
