//! Integration tests for the crawl engine
//!
//! These tests drive complete crawls, either end-to-end over HTTP against a
//! wiremock server or against an in-memory snapshot site that counts every
//! fetch.

use async_trait::async_trait;
use site_context::config::FetcherConfig;
use site_context::crawler::{CrawlEngine, Fetcher, RenderedDocument, SnapshotFetcher};
use site_context::output::{ContextAccumulator, PageObserver, PageRecord};
use site_context::{start_crawl, CrawlerError, EngineState, FetchError, FetchErrorKind, HttpFetcher};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page(body: &str) -> String {
    format!("<html><head><title>t</title></head><body>{}</body></html>", body)
}

fn html_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(page(body), "text/html; charset=utf-8")
}

fn paths(urls: &[Url]) -> Vec<String> {
    urls.iter().map(|u| u.path().to_string()).collect()
}

/// Collects every record passed to the observer
#[derive(Default)]
struct RecordingObserver {
    seen: Mutex<Vec<PageRecord>>,
}

impl PageObserver for RecordingObserver {
    fn on_page(&self, record: &PageRecord) {
        self.seen.lock().unwrap().push(record.clone());
    }
}

#[tokio::test]
async fn test_full_crawl_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(
            r#"<h1>Home</h1>
               <a href="/about">About</a>
               <a href="/docs?b=2&a=1">Docs</a>
               <a href="http://other.test/">Elsewhere</a>
               <a href="/missing">Broken</a>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html_response(r#"<p>About us</p><a href="/">Home</a>"#))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(html_response(
            r#"<script>var hidden = true;</script><p>Documentation</p><a href="/docs?a=1&b=2#top">Self</a>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Arc::new(HttpFetcher::new(&FetcherConfig::default()).unwrap());
    let observer = Arc::new(RecordingObserver::default());

    let result = start_crawl(
        &format!("{}/", server.uri()),
        fetcher,
        Some(observer.clone() as Arc<dyn PageObserver>),
    )
    .await
    .unwrap();

    let records = result.context.records();
    let record_paths: Vec<_> = records.iter().map(|r| r.url.path().to_string()).collect();
    assert_eq!(record_paths, vec!["/", "/about", "/docs"]);
    assert_eq!(records[2].url.query(), Some("a=1&b=2"));

    let context = result.get_context();
    assert!(context.starts_with("Home\nAbout\nDocs\nElsewhere\nBroken\n\nAbout us\nHome\n\n"));
    assert!(context.contains("Documentation"));
    assert!(!context.contains("hidden"));

    assert_eq!(result.stats.fetches_dispatched, 4);
    assert_eq!(result.stats.pages_recorded, 3);
    assert_eq!(result.stats.offsite_links, 1);
    assert_eq!(
        result.stats.fetch_failures.get(&FetchErrorKind::HttpStatus),
        Some(&1)
    );

    assert_eq!(*observer.seen.lock().unwrap(), records);
}

#[tokio::test]
async fn test_http_redirect_off_site_never_reaches_other_host() {
    let server = MockServer::start().await;
    let other = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(r#"<p>Home</p><a href="/go">Go</a><a href="/stay">Stay</a>"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/go"))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "location",
            format!("http://localhost:{}/landing", other.address().port()).as_str(),
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stay"))
        .respond_with(html_response("<p>Stayed</p>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(html_response("<p>Landing</p>"))
        .expect(0)
        .mount(&other)
        .await;

    let fetcher = Arc::new(HttpFetcher::new(&FetcherConfig::default()).unwrap());
    let result = start_crawl(&format!("{}/", server.uri()), fetcher, None)
        .await
        .unwrap();

    let record_paths: Vec<_> = result
        .context
        .records()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(record_paths, vec!["/", "/stay"]);
    assert_eq!(
        result.stats.fetch_failures.get(&FetchErrorKind::Blocked),
        Some(&1)
    );
    assert!(other.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_seed_without_scheme_gets_http() {
    let mut site = SnapshotFetcher::new();
    site.insert_page(
        "http://example.test/",
        page(r#"<a href="/a">A</a><a href="/b">B</a><a href="http://external.test/x">X</a>"#),
    )
    .unwrap();
    site.insert_page("http://example.test/a", page("<p>A</p>")).unwrap();
    site.insert_page("http://example.test/b", page("<p>B</p>")).unwrap();
    let site = Arc::new(site);

    let result = start_crawl("example.test", site.clone(), None).await.unwrap();

    let fetched = site.fetched_urls();
    assert_eq!(fetched[0].as_str(), "http://example.test/");
    assert_eq!(site.fetch_count(), 3);
    assert!(fetched.iter().all(|u| u.host_str() == Some("example.test")));
    assert_eq!(result.stats.offsite_links, 1);
    assert_eq!(result.context.len(), 3);
}

#[tokio::test]
async fn test_cyclic_links_terminate() {
    let mut site = SnapshotFetcher::new();
    site.insert_page("http://example.test/a", page(r#"<p>A</p><a href="/b">B</a>"#))
        .unwrap();
    site.insert_page("http://example.test/b", page(r#"<p>B</p><a href="/a">A</a>"#))
        .unwrap();
    let site = Arc::new(site);

    let engine = CrawlEngine::new(site.clone());
    engine.start("http://example.test/a").await.unwrap();

    assert_eq!(engine.state(), EngineState::Done);
    assert_eq!(paths(&site.fetched_urls()), vec!["/a", "/b"]);
    assert_eq!(engine.accumulator().get_context(), "A\nB\n\nB\nA");
}

#[tokio::test]
async fn test_seed_failure_yields_empty_context() {
    let mut site = SnapshotFetcher::new();
    site.insert_failure(
        "http://example.test/",
        FetchError::Network {
            url: "http://example.test/".to_string(),
            message: "connection refused".to_string(),
        },
    )
    .unwrap();
    let site = Arc::new(site);

    let result = start_crawl("example.test", site.clone(), None).await.unwrap();

    assert_eq!(result.get_context(), "");
    assert!(result.context.is_empty());
    assert_eq!(site.fetch_count(), 1);
    assert_eq!(
        result.stats.fetch_failures.get(&FetchErrorKind::Network),
        Some(&1)
    );
}

#[tokio::test]
async fn test_failed_page_does_not_abort_crawl() {
    let mut site = SnapshotFetcher::new();
    site.insert_page(
        "http://example.test/",
        page(r#"<p>Home</p><a href="/slow">Slow</a><a href="/ok">Ok</a>"#),
    )
    .unwrap();
    site.insert_failure(
        "http://example.test/slow",
        FetchError::Timeout {
            url: "http://example.test/slow".to_string(),
        },
    )
    .unwrap();
    site.insert_page("http://example.test/ok", page("<p>Fine</p>")).unwrap();
    let site = Arc::new(site);

    let result = start_crawl("example.test", site.clone(), None).await.unwrap();

    assert_eq!(site.fetch_count(), 3);
    let record_paths: Vec<_> = result
        .context
        .records()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(record_paths, vec!["/", "/ok"]);
    assert!(result.get_context().ends_with("\n\nFine"));
    assert_eq!(result.stats.total_failures(), 1);
}

#[tokio::test]
async fn test_shared_link_fetched_once() {
    let mut site = SnapshotFetcher::new();
    site.insert_page(
        "http://example.test/",
        page(r#"<a href="/1">1</a><a href="/2">2</a><a href="/3">3</a><a href="/shared">S</a>"#),
    )
    .unwrap();
    for n in 1..=3 {
        site.insert_page(
            &format!("http://example.test/{}", n),
            page(r#"<a href="/shared">Shared</a><a href="/">Home</a>"#),
        )
        .unwrap();
    }
    site.insert_page("http://example.test/shared", page("<p>Shared</p>"))
        .unwrap();
    site.set_delay(Duration::from_millis(5));
    let site = Arc::new(site);

    let engine = CrawlEngine::new(site.clone()).with_concurrency(4);
    let stats = engine.start("example.test").await.unwrap();

    let fetched = site.fetched_urls();
    let distinct: HashSet<_> = fetched.iter().map(|u| u.as_str().to_string()).collect();
    assert_eq!(fetched.len(), 5);
    assert_eq!(distinct.len(), 5);
    assert_eq!(stats.pages_recorded, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_crawl_fetches_each_page_once() {
    // Every page links to its two successors and back to the seed
    let mut site = SnapshotFetcher::new();
    let pages = 40;
    for n in 0..pages {
        let body = format!(
            r#"<p>Page {n}</p><a href="/p{a}">next</a><a href="/p{b}">skip</a><a href="/p0">home</a>"#,
            n = n,
            a = (n + 1) % pages,
            b = (n + 2) % pages,
        );
        site.insert_page(&format!("http://example.test/p{}", n), page(&body))
            .unwrap();
    }
    site.set_delay(Duration::from_millis(2));
    let site = Arc::new(site);

    let observer = Arc::new(RecordingObserver::default());
    let engine = CrawlEngine::new(site.clone())
        .with_concurrency(8)
        .with_observer(observer.clone());
    let stats = engine.start("http://example.test/p0").await.unwrap();

    let fetched = site.fetched_urls();
    let distinct: HashSet<_> = fetched.iter().map(|u| u.as_str().to_string()).collect();
    assert_eq!(fetched.len(), pages);
    assert_eq!(distinct.len(), pages);
    assert_eq!(stats.pages_recorded, pages as u64);

    // Delivery order is unspecified, but observer and accumulator agree on it
    let records = engine.accumulator().records();
    assert_eq!(*observer.seen.lock().unwrap(), records);

    let sequences: HashSet<_> = records.iter().map(|r| r.sequence).collect();
    assert_eq!(sequences.len(), pages);
    assert!(records
        .iter()
        .any(|r| r.sequence == 0 && r.url.path() == "/p0"));
}

#[tokio::test]
async fn test_restart_fails_with_already_finished() {
    let mut site = SnapshotFetcher::new();
    site.insert_page("http://example.test/", page("<p>Only</p>"))
        .unwrap();

    let engine = CrawlEngine::new(Arc::new(site));
    engine.start("example.test").await.unwrap();

    let err = engine.start("example.test").await.unwrap_err();
    assert!(matches!(err, CrawlerError::AlreadyFinished));
    assert_eq!(engine.accumulator().len(), 1);
}

#[tokio::test]
async fn test_invalid_seed_is_rejected() {
    let site = Arc::new(SnapshotFetcher::new());

    for seed in ["", "   ", "ftp://example.test/", "http://", "http://exa mple.test/"] {
        let err = start_crawl(seed, site.clone(), None).await.unwrap_err();
        assert!(
            matches!(err, CrawlerError::InvalidUrl(_)),
            "seed {:?} gave {:?}",
            seed,
            err
        );
    }

    assert_eq!(site.fetch_count(), 0);
}

#[tokio::test]
async fn test_redirect_to_visited_page_is_dropped() {
    let mut site = SnapshotFetcher::new();
    site.insert_page(
        "http://example.test/",
        page(r#"<a href="/old">Old</a><a href="/new">New</a>"#),
    )
    .unwrap();
    site.insert_redirect("http://example.test/old", "http://example.test/new")
        .unwrap();
    site.insert_page("http://example.test/new", page("<p>New home</p>"))
        .unwrap();
    let site = Arc::new(site);

    let result = start_crawl("example.test", site.clone(), None).await.unwrap();

    assert_eq!(site.fetch_count(), 3);
    assert_eq!(result.stats.duplicate_redirects, 1);
    let record_paths: Vec<_> = result
        .context
        .records()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(record_paths, vec!["/", "/new"]);
}

#[tokio::test]
async fn test_redirect_records_final_url() {
    let mut site = SnapshotFetcher::new();
    site.insert_page("http://example.test/", page(r#"<a href="/old">Old</a>"#))
        .unwrap();
    site.insert_redirect("http://example.test/old", "http://example.test/new")
        .unwrap();
    site.insert_page(
        "http://example.test/new",
        page(r#"<p>Moved</p><a href="/old">Again</a><a href="/new">Self</a>"#),
    )
    .unwrap();
    let site = Arc::new(site);

    let result = start_crawl("example.test", site.clone(), None).await.unwrap();

    assert_eq!(site.fetch_count(), 2);
    let records = result.context.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].url.as_str(), "http://example.test/new");
    assert_eq!(records[1].sequence, 1);
}

#[tokio::test]
async fn test_offsite_redirect_is_blocked() {
    let mut site = SnapshotFetcher::new();
    site.insert_page("http://example.test/", page(r#"<a href="/away">Away</a>"#))
        .unwrap();
    site.insert_redirect("http://example.test/away", "http://other.test/")
        .unwrap();
    site.insert_page("http://other.test/", page("<p>Other</p>")).unwrap();
    let site = Arc::new(site);

    let result = start_crawl("example.test", site.clone(), None).await.unwrap();

    assert_eq!(result.context.len(), 1);
    assert_eq!(
        result.stats.fetch_failures.get(&FetchErrorKind::Blocked),
        Some(&1)
    );
}

#[tokio::test]
async fn test_existing_accumulator_is_extended() {
    let mut site = SnapshotFetcher::new();
    site.insert_page("http://example.test/", page("<p>Second</p>"))
        .unwrap();

    let accumulator = Arc::new(ContextAccumulator::new());
    accumulator.add(PageRecord::new(
        Url::parse("http://earlier.test/").unwrap(),
        "First".to_string(),
        0,
    ));

    let engine = CrawlEngine::new(Arc::new(site)).with_accumulator(accumulator.clone());
    engine.start("example.test").await.unwrap();

    assert_eq!(accumulator.get_context(), "First\n\nSecond");
}

/// Raises a cancellation token as soon as the first fetch starts
struct CancelOnFirstFetch {
    inner: SnapshotFetcher,
    token: CancellationToken,
}

#[async_trait]
impl Fetcher for CancelOnFirstFetch {
    async fn fetch(&self, url: &Url) -> Result<RenderedDocument, FetchError> {
        self.token.cancel();
        self.inner.fetch(url).await
    }
}

#[tokio::test]
async fn test_cancellation_stops_dispatch() {
    let mut inner = SnapshotFetcher::new();
    let pages = 50;
    for n in 0..pages {
        inner
            .insert_page(
                &format!("http://example.test/p{}", n),
                page(&format!(r#"<p>Page {}</p><a href="/p{}">next</a>"#, n, n + 1)),
            )
            .unwrap();
    }
    inner.set_delay(Duration::from_millis(10));

    let token = CancellationToken::new();
    let fetcher = Arc::new(CancelOnFirstFetch {
        inner,
        token: token.clone(),
    });

    let engine = CrawlEngine::new(fetcher.clone())
        .with_concurrency(2)
        .with_cancellation(token);
    let stats = engine.start("http://example.test/p0").await.unwrap();

    assert!(stats.cancelled);
    assert_eq!(engine.state(), EngineState::Done);

    let fetched = fetcher.inner.fetch_count();
    assert!(fetched < pages, "fetched {} pages after cancellation", fetched);

    // Every fetch that completed still produced a full record
    let records = engine.accumulator().records();
    assert_eq!(records.len() as u64, stats.pages_recorded);
    assert_eq!(stats.fetches_dispatched as usize, fetched);
    assert!(records.iter().all(|r| r.text.starts_with("Page ")));
}

#[tokio::test]
async fn test_cancelled_before_start_fetches_nothing_more_than_seed() {
    let mut site = SnapshotFetcher::new();
    site.insert_page("http://example.test/", page(r#"<a href="/a">A</a>"#))
        .unwrap();
    site.insert_page("http://example.test/a", page("<p>A</p>")).unwrap();
    let site = Arc::new(site);

    let token = CancellationToken::new();
    token.cancel();

    let engine = CrawlEngine::new(site.clone()).with_cancellation(token);
    let stats = engine.start("example.test").await.unwrap();

    assert!(stats.cancelled);
    assert!(site.fetch_count() <= 1);
    assert_eq!(engine.state(), EngineState::Done);
}
