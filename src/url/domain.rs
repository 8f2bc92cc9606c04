use url::Url;

/// Extracts the host from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// The port is not part of the host.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_context::url::extract_host;
///
/// let url = Url::parse("https://EXAMPLE.test:8080/path").unwrap();
/// assert_eq!(extract_host(&url), Some("example.test".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if the URL's host is exactly `allowed_host`
///
/// Subdomains do not match: `docs.example.test` is off-site for a crawl
/// seeded on `example.test`. Ports and schemes are not compared, so
/// `http://example.test:9090/` is in-domain for a seed on port 8080.
pub fn is_same_host(url: &Url, allowed_host: &str) -> bool {
    url.host_str()
        .is_some_and(|host| host.eq_ignore_ascii_case(allowed_host))
}
