use crate::{UrlError, UrlResult};
use url::Url;

/// Scheme assumed for seeds typed without one
const DEFAULT_SCHEME: &str = "http";

/// Normalizes a seed URL as typed by a user
///
/// Seeds without a scheme get `http://` prepended before normalization, so
/// `"example.test"` becomes `"http://example.test/"`.
///
/// # Arguments
///
/// * `raw` - The seed string
///
/// # Returns
///
/// * `Ok(Url)` - Normalized absolute URL
/// * `Err(UrlError)` - The seed cannot be parsed into scheme, host and path
///
/// # Examples
///
/// ```
/// use site_context::url::normalize_seed;
///
/// let url = normalize_seed("example.test").unwrap();
/// assert_eq!(url.as_str(), "http://example.test/");
/// ```
pub fn normalize_seed(raw: &str) -> UrlResult<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    if has_scheme(raw) {
        normalize_url(raw)
    } else {
        normalize_url(&format!("{}://{}", DEFAULT_SCHEME, raw))
    }
}

/// Normalizes an absolute URL so equal pages compare equal
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only `http` and `https`
/// 3. Require a host (the parser lowercases it)
/// 4. Remove fragment (everything after #)
/// 5. Sort query parameters by key, dropping an empty query string
///
/// Paths are left as the parser canonicalized them: dot segments are resolved
/// and an empty path becomes `/`, but trailing slashes are significant.
///
/// # Examples
///
/// ```
/// use site_context::url::normalize_url;
///
/// let url = normalize_url("HTTP://Example.TEST/a/../b?z=1&a=2#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.test/b?a=2&z=1");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(format!("{}: {}", url_str, e)))?;
    normalize_parsed(url)
}

/// Resolves a link against the page it was found on and normalizes the result
///
/// # Arguments
///
/// * `href` - The raw link target, absolute or relative
/// * `base` - The URL of the page containing the link
///
/// # Examples
///
/// ```
/// use site_context::url::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("http://example.test/docs/intro").unwrap();
/// let url = resolve_link("setup#install", &base).unwrap();
/// assert_eq!(url.as_str(), "http://example.test/docs/setup");
/// ```
pub fn resolve_link(href: &str, base: &Url) -> UrlResult<Url> {
    let joined = base
        .join(href.trim())
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;
    normalize_parsed(joined)
}

fn normalize_parsed(mut url: Url) -> UrlResult<Url> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlError::MissingHost(url.to_string())),
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let params = sorted_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Collects query parameters sorted by key; equal keys keep their order
fn sorted_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
}

/// Returns true if the string starts with `scheme://`
fn has_scheme(raw: &str) -> bool {
    let Some((scheme, _)) = raw.split_once("://") else {
        return false;
    };

    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
