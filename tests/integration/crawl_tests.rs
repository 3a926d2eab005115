//! Integration tests for the crawler
//!
//! Most tests drive full crawls against in-memory collaborators so that the
//! link graph is exact; the last ones use wiremock to run the HTTP-backed
//! collaborators end-to-end.

use async_trait::async_trait;
use chrono::Utc;
use focal_crawl::config::{
    Config, CrawlPolicy, CrawlerConfig, OutputConfig, SeedConfig, UserAgentConfig,
};
use focal_crawl::crawler::{
    AllowAllRobots, Collaborators, CrawlSession, FetchedPage, PageFetcher, RobotsPolicy,
    Scheduler, StaticSeedProvider,
};
use focal_crawl::output::write_outputs;
use focal_crawl::{FocalError, UrlRecord};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling `target` pages with `workers` workers
fn create_test_config(target: usize, workers: usize, policy: CrawlPolicy) -> Config {
    Config {
        crawler: CrawlerConfig {
            policy,
            workers,
            target,
            pop_timeout_ms: 50,
            fetch_timeout_secs: 2,
            robots_timeout_secs: 2,
            robots_cache_ttl_secs: 0,
            max_depth: None,
            max_worker_restarts: 0,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        seeds: SeedConfig {
            phrase: "test phrase".to_string(),
            count: 5,
            search_url: "https://html.duckduckgo.com/html/".to_string(),
            urls: Vec::new(),
        },
        output: OutputConfig::default(),
    }
}

/// In-memory web: normalized URL -> hrefs on that page
#[derive(Default)]
struct SiteMap {
    pages: HashMap<String, Vec<String>>,
    fetches: Mutex<HashMap<String, usize>>,
}

impl SiteMap {
    fn page(mut self, url: &str, hrefs: &[&str]) -> Self {
        self.pages
            .insert(url.to_string(), hrefs.iter().map(|h| h.to_string()).collect());
        self
    }

    fn fetch_count(&self, url: &str) -> usize {
        self.fetches.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn max_fetches_per_url(&self) -> usize {
        self.fetches.lock().unwrap().values().copied().max().unwrap_or(0)
    }
}

#[async_trait]
impl PageFetcher for SiteMap {
    async fn fetch_and_extract(&self, url: &Url) -> Option<FetchedPage> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default() += 1;

        let hrefs = self.pages.get(url.as_str())?;
        Some(FetchedPage {
            response_code: 200,
            fetched_at: Utc::now(),
            size: 100,
            hrefs: hrefs.clone(),
        })
    }
}

/// Panics the first time `trap` is fetched
struct PanicOnce {
    site: Arc<SiteMap>,
    trap: String,
    tripped: AtomicBool,
}

#[async_trait]
impl PageFetcher for PanicOnce {
    async fn fetch_and_extract(&self, url: &Url) -> Option<FetchedPage> {
        if url.as_str() == self.trap && !self.tripped.swap(true, Ordering::SeqCst) {
            panic!("simulated fetcher crash on {}", url);
        }
        self.site.fetch_and_extract(url).await
    }
}

/// Panics on every fetch
struct AlwaysPanics;

#[async_trait]
impl PageFetcher for AlwaysPanics {
    async fn fetch_and_extract(&self, url: &Url) -> Option<FetchedPage> {
        panic!("simulated fetcher crash on {}", url);
    }
}

/// Denies every URL whose path starts with one of the prefixes
struct DenyPrefixes(Vec<&'static str>);

#[async_trait]
impl RobotsPolicy for DenyPrefixes {
    async fn can_fetch(&self, _base_url: &str, url: &Url) -> bool {
        !self.0.iter().any(|prefix| url.path().starts_with(prefix))
    }
}

fn collaborators(
    seeds: &[&str],
    site: Arc<SiteMap>,
    robots: impl RobotsPolicy + 'static,
) -> Collaborators {
    Collaborators {
        seeds: Arc::new(StaticSeedProvider::new(
            seeds.iter().map(|s| s.to_string()).collect(),
        )),
        fetcher: site,
        robots: Arc::new(robots),
    }
}

fn report_urls(entries: &[focal_crawl::ReportEntry]) -> Vec<String> {
    entries.iter().map(|e| e.url.clone()).collect()
}

#[tokio::test]
async fn test_single_page_crawl_scores_discovered_links() {
    let site = Arc::new(SiteMap::default().page(
        "http://a.test/x",
        &["http://a.test/y", "http://b.test/z"],
    ));
    let config = create_test_config(1, 1, CrawlPolicy::Prioritized);
    let scheduler = Scheduler::new(
        &config,
        collaborators(&["http://a.test/x"], site, AllowAllRobots),
    )
    .unwrap();
    let session = scheduler.session();

    let outcome = scheduler.run().await.unwrap();

    assert_eq!(report_urls(&outcome.entries), vec!["http://a.test/x"]);
    assert_eq!(outcome.entries[0].response_code, Some(200));
    assert_eq!(outcome.entries[0].depth, 0);
    assert!(!outcome.exhausted);

    // same-domain link weighs 1, cross-domain link weighs 2
    assert_eq!(session.frontier_count_at(&["a.test", "y"]), Some(1));
    assert_eq!(session.frontier_count_at(&["b.test", "z"]), Some(2));
    assert!(session.frontier_record_at(&["a.test", "y"]).is_some());
    assert!(session.frontier_record_at(&["b.test", "z"]).is_some());
}

#[tokio::test]
async fn test_malformed_href_is_dropped() {
    let site = Arc::new(
        SiteMap::default()
            .page("http://a.test/x", &["not a url", "http://", "http://a.test/ok"])
            .page("http://a.test/ok", &[]),
    );
    let config = create_test_config(5, 1, CrawlPolicy::Prioritized);
    let scheduler = Scheduler::new(
        &config,
        collaborators(&["http://a.test/x"], site, AllowAllRobots),
    )
    .unwrap();
    let session = scheduler.session();

    let outcome = scheduler.run().await.unwrap();

    assert_eq!(
        report_urls(&outcome.entries),
        vec!["http://a.test/x", "http://a.test/ok"]
    );
    // a.test, x and ok only
    assert_eq!(session.frontier_node_count(), 3);
    assert!(outcome.exhausted);
}

/// A connected graph of 60 pages spread over six domains
fn large_site() -> SiteMap {
    let url = |i: usize| format!("http://site{}.test/p{}", i % 6, i);
    let mut site = SiteMap::default();
    for i in 0..60 {
        let links: Vec<String> = [(i + 1) % 60, (i * 7 + 3) % 60, (i * 11 + 5) % 60]
            .iter()
            .map(|&j| url(j))
            .collect();
        let links: Vec<&str> = links.iter().map(String::as_str).collect();
        site = site.page(&url(i), &links);
    }
    site
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_report_is_capped_at_target() {
    let site = Arc::new(large_site());
    let config = create_test_config(20, 8, CrawlPolicy::Prioritized);
    let scheduler = Scheduler::new(
        &config,
        collaborators(&["http://site0.test/p0"], Arc::clone(&site), AllowAllRobots),
    )
    .unwrap();

    let outcome = scheduler.run().await.unwrap();

    assert_eq!(outcome.entries.len(), 20);
    let unique: HashSet<String> = report_urls(&outcome.entries).into_iter().collect();
    assert_eq!(unique.len(), 20);
    assert!(site.max_fetches_per_url() <= 1);
    assert!(!outcome.exhausted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_breadth_first_is_capped_at_target() {
    let site = Arc::new(large_site());
    let config = create_test_config(25, 6, CrawlPolicy::BreadthFirst);
    let scheduler = Scheduler::new(
        &config,
        collaborators(&["http://site0.test/p0"], Arc::clone(&site), AllowAllRobots),
    )
    .unwrap();

    let outcome = scheduler.run().await.unwrap();

    assert_eq!(outcome.entries.len(), 25);
    assert!(site.max_fetches_per_url() <= 1);
}

#[tokio::test]
async fn test_breadth_first_visits_level_by_level() {
    let site = Arc::new(
        SiteMap::default()
            .page("http://a.test/", &["/l1a", "/l1b"])
            .page("http://a.test/l1a", &["/l1a/l2"])
            .page("http://a.test/l1b", &["/l1b/l2"])
            .page("http://a.test/l1a/l2", &[])
            .page("http://a.test/l1b/l2", &[]),
    );
    let config = create_test_config(10, 1, CrawlPolicy::BreadthFirst);
    let scheduler = Scheduler::new(
        &config,
        collaborators(&["http://a.test/"], site, AllowAllRobots),
    )
    .unwrap();

    let outcome = scheduler.run().await.unwrap();

    assert_eq!(
        report_urls(&outcome.entries),
        vec![
            "http://a.test/",
            "http://a.test/l1a",
            "http://a.test/l1b",
            "http://a.test/l1a/l2",
            "http://a.test/l1b/l2",
        ]
    );
    let depths: Vec<u32> = outcome.entries.iter().map(|e| e.depth).collect();
    assert_eq!(depths, vec![0, 1, 1, 2, 2]);
}

#[tokio::test]
async fn test_prioritized_prefers_unexplored_domains() {
    // a.test links to two more a.test pages and one page on a fresh domain;
    // once a.test is explored the fresh domain must come first
    let site = Arc::new(
        SiteMap::default()
            .page("http://a.test/", &["/one", "/two", "http://b.test/three"])
            .page("http://a.test/one", &[])
            .page("http://a.test/two", &[])
            .page("http://b.test/three", &[]),
    );
    let config = create_test_config(10, 1, CrawlPolicy::Prioritized);
    let scheduler = Scheduler::new(
        &config,
        collaborators(&["http://a.test/"], site, AllowAllRobots),
    )
    .unwrap();

    let outcome = scheduler.run().await.unwrap();

    let urls = report_urls(&outcome.entries);
    assert_eq!(urls.len(), 4);
    assert_eq!(urls[1], "http://b.test/three");
}

#[tokio::test]
async fn test_robots_denied_page_is_excluded_but_explored() {
    let site = Arc::new(
        SiteMap::default()
            .page("http://a.test/", &["/private/page", "/public"])
            .page("http://a.test/private/page", &["/from-private"])
            .page("http://a.test/public", &[]),
    );
    let config = create_test_config(10, 1, CrawlPolicy::Prioritized);
    let scheduler = Scheduler::new(
        &config,
        collaborators(&["http://a.test/"], Arc::clone(&site), DenyPrefixes(vec!["/private"])),
    )
    .unwrap();
    let session = scheduler.session();

    let outcome = scheduler.run().await.unwrap();

    let urls = report_urls(&outcome.entries);
    assert_eq!(urls.len(), 2);
    assert!(!urls.iter().any(|u| u.contains("/private")));
    assert_eq!(outcome.robots_denied, 1);
    assert_eq!(site.fetch_count("http://a.test/private/page"), 0);

    let denied = UrlRecord::new("http://a.test/private/page", 1).unwrap();
    assert!(session.is_explored(&denied));
    assert_eq!(session.frontier_count_at(&["a.test", "from-private"]), None);
}

#[tokio::test]
async fn test_failed_fetch_is_reported_without_code() {
    let site = Arc::new(SiteMap::default().page("http://a.test/", &["/gone"]));
    let config = create_test_config(10, 1, CrawlPolicy::Prioritized);
    let scheduler = Scheduler::new(
        &config,
        collaborators(&["http://a.test/"], site, AllowAllRobots),
    )
    .unwrap();

    let outcome = scheduler.run().await.unwrap();

    assert_eq!(outcome.entries.len(), 2);
    let gone = outcome
        .entries
        .iter()
        .find(|e| e.url == "http://a.test/gone")
        .unwrap();
    assert_eq!(gone.response_code, None);
    assert_eq!(gone.timestamp, None);
    assert_eq!(gone.size, None);
}

#[tokio::test]
async fn test_exhausted_frontier_terminates() {
    let site = Arc::new(
        SiteMap::default()
            .page("http://a.test/", &["/b", "/c"])
            .page("http://a.test/b", &["/c", "/"])
            .page("http://a.test/c", &["/b"]),
    );
    let config = create_test_config(100, 4, CrawlPolicy::Prioritized);
    let scheduler = Scheduler::new(
        &config,
        collaborators(&["http://a.test/"], Arc::clone(&site), AllowAllRobots),
    )
    .unwrap();

    let outcome = tokio::time::timeout(std::time::Duration::from_secs(10), scheduler.run())
        .await
        .expect("crawl did not terminate")
        .unwrap();

    assert_eq!(outcome.entries.len(), 3);
    assert!(outcome.exhausted);
    assert_eq!(site.max_fetches_per_url(), 1);
}

#[tokio::test]
async fn test_distinct_urls_sharing_a_trie_path_are_all_crawled() {
    let site = Arc::new(
        SiteMap::default()
            .page(
                "http://a.test/",
                &["/a=1", "/?a=1", "http://b.test/p", "https://b.test/p"],
            )
            .page("http://a.test/a=1", &[])
            .page("http://a.test/?a=1", &[])
            .page("http://b.test/p", &[])
            .page("https://b.test/p", &[]),
    );
    let config = create_test_config(10, 1, CrawlPolicy::Prioritized);
    let scheduler = Scheduler::new(
        &config,
        collaborators(&["http://a.test/"], Arc::clone(&site), AllowAllRobots),
    )
    .unwrap();

    let outcome = scheduler.run().await.unwrap();

    let mut crawled = report_urls(&outcome.entries);
    crawled.sort();
    assert_eq!(
        crawled,
        vec![
            "http://a.test/",
            "http://a.test/?a=1",
            "http://a.test/a=1",
            "http://b.test/p",
            "https://b.test/p",
        ]
    );
    assert!(outcome.exhausted);
    assert_eq!(site.max_fetches_per_url(), 1);
}

#[tokio::test]
async fn test_empty_seed_set_finishes_immediately() {
    let config = create_test_config(10, 2, CrawlPolicy::Prioritized);
    let scheduler = Scheduler::new(
        &config,
        collaborators(&["not a url"], Arc::new(SiteMap::default()), AllowAllRobots),
    )
    .unwrap();

    let outcome = scheduler.run().await.unwrap();

    assert!(outcome.entries.is_empty());
    assert!(outcome.exhausted);
}

#[tokio::test]
async fn test_depth_limit() {
    let site = Arc::new(
        SiteMap::default()
            .page("http://a.test/", &["/d1"])
            .page("http://a.test/d1", &["/d1/d2"])
            .page("http://a.test/d1/d2", &["/d1/d2/d3"]),
    );
    let mut config = create_test_config(10, 1, CrawlPolicy::Prioritized);
    config.crawler.max_depth = Some(1);
    let scheduler = Scheduler::new(
        &config,
        collaborators(&["http://a.test/"], site, AllowAllRobots),
    )
    .unwrap();

    let outcome = scheduler.run().await.unwrap();

    assert_eq!(
        report_urls(&outcome.entries),
        vec!["http://a.test/", "http://a.test/d1"]
    );
}

#[tokio::test]
async fn test_panicked_worker_is_restarted() {
    // the fresh domain is crawled right after the root, while /a is still
    // queued, so the pool is not finished when the worker dies
    let site = Arc::new(
        SiteMap::default()
            .page("http://a.test/", &["http://trap.test/", "/a", "/b"])
            .page("http://a.test/a", &[])
            .page("http://a.test/b", &[]),
    );
    let mut config = create_test_config(10, 1, CrawlPolicy::Prioritized);
    config.crawler.max_worker_restarts = 1;
    let collaborators = Collaborators {
        seeds: Arc::new(StaticSeedProvider::new(vec!["http://a.test/".to_string()])),
        fetcher: Arc::new(PanicOnce {
            site,
            trap: "http://trap.test/".to_string(),
            tripped: AtomicBool::new(false),
        }),
        robots: Arc::new(AllowAllRobots),
    };

    let outcome = Scheduler::new(&config, collaborators)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.worker_restarts, 1);
    let urls = report_urls(&outcome.entries);
    assert_eq!(urls.len(), 3);
    assert!(!urls.contains(&"http://trap.test/".to_string()));
}

#[tokio::test]
async fn test_pool_failure_without_restarts() {
    let config = create_test_config(10, 1, CrawlPolicy::Prioritized);
    let collaborators = Collaborators {
        seeds: Arc::new(StaticSeedProvider::new(vec![
            "http://a.test/".to_string(),
            "http://b.test/".to_string(),
        ])),
        fetcher: Arc::new(AlwaysPanics),
        robots: Arc::new(AllowAllRobots),
    };

    let result = Scheduler::new(&config, collaborators).unwrap().run().await;

    assert!(matches!(result, Err(FocalError::WorkerPool(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_discovery_leaves_one_current_record() {
    let session = Arc::new(CrawlSession::new(
        create_test_config(10, 8, CrawlPolicy::Prioritized).crawler,
    ));

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                let page = UrlRecord::new(&format!("http://p{}.test/page", i), 0).unwrap();
                let link = UrlRecord::new("http://c.test/shared", 1).unwrap();
                session.enqueue_links(Some(&page), vec![link]);
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    // every discovery was cross-domain
    assert_eq!(session.frontier_count_at(&["c.test", "shared"]), Some(16));

    let current = session.frontier_record_at(&["c.test", "shared"]).unwrap();
    assert!(current.is_valid());

    let mut live = Vec::new();
    while let Some(record) = session.queue().try_pop() {
        live.push(record);
    }
    assert_eq!(live.len(), 1);
    assert!(live[0].same_entry(&current));
}

#[tokio::test]
async fn test_scheduler_rejects_invalid_configuration() {
    let site = Arc::new(SiteMap::default());

    let mut config = create_test_config(10, 0, CrawlPolicy::Prioritized);
    assert!(Scheduler::new(&config, collaborators(&[], Arc::clone(&site), AllowAllRobots)).is_err());

    config.crawler.workers = 1;
    config.crawler.target = 0;
    assert!(Scheduler::new(&config, collaborators(&[], Arc::clone(&site), AllowAllRobots)).is_err());

    config.crawler.target = 1;
    config.seeds.phrase = "   ".to_string();
    assert!(Scheduler::new(&config, collaborators(&[], site, AllowAllRobots)).is_err());
}

/// Encodes a URL the way a search engine redirect link carries it
fn uddg_link(target: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
    format!("/l/?uddg={}", encoded)
}

#[tokio::test]
async fn test_full_crawl_over_http() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Search result page pointing at the site root
    Mock::given(method("GET"))
        .and(path("/html/"))
        .and(query_param("q", "test phrase"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<html><body><a class="result__a" href="{}">Result</a></body></html>"#,
            uddg_link(&format!("{}/", base_url))
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /secret"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <a href="/a">A</a>
                <a href="/b">B</a>
                <a href="/secret">Secret</a>
                <a href="/logo.png">Logo</a>
            </body></html>"#,
        ))
        .mount(&mock_server)
        .await;

    for page in ["/a", "/b"] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html><body>leaf</body></html>"),
            )
            .mount(&mock_server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hidden"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let mut config = create_test_config(3, 2, CrawlPolicy::Prioritized);
    config.seeds.search_url = format!("{}/html/", base_url);
    config.output.csv_path = Some(dir.path().join("log.csv").display().to_string());
    config.output.database_path = Some(dir.path().join("crawl.db").display().to_string());

    let outcome = focal_crawl::crawler::crawl(&config).await.unwrap();

    let urls: HashSet<String> = report_urls(&outcome.entries).into_iter().collect();
    let expected: HashSet<String> = ["/", "/a", "/b"]
        .iter()
        .map(|p| format!("{}{}", base_url, p))
        .collect();
    assert_eq!(urls, expected);
    assert!(outcome.entries.iter().all(|e| e.response_code == Some(200)));

    write_outputs(&config.output, &outcome.entries, "test-hash").unwrap();
    let csv = std::fs::read_to_string(dir.path().join("log.csv")).unwrap();
    assert_eq!(csv.lines().count(), 4);
    assert!(dir.path().join("crawl.db").exists());
}

#[tokio::test]
async fn test_failed_search_yields_configured_seeds_only() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(5, 1, CrawlPolicy::Prioritized);
    config.seeds.search_url = format!("{}/html/", base_url);
    config.seeds.urls = vec![format!("{}/start", base_url)];

    let outcome = focal_crawl::crawler::crawl(&config).await.unwrap();

    assert_eq!(
        report_urls(&outcome.entries),
        vec![format!("{}/start", base_url)]
    );
    assert!(outcome.exhausted);
}
