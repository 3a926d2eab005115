//! Seams between the crawl core and the outside world
//!
//! The scheduler only talks to the network through these traits, so tests can
//! drive full crawls against in-memory implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use url::Url;

/// What a successful fetch hands back to the scheduler
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    /// HTTP status code
    pub response_code: u16,

    /// When the response was received
    pub fetched_at: DateTime<Utc>,

    /// Body size in bytes
    pub size: u64,

    /// Raw `href` values in document order, not yet vetted
    pub hrefs: Vec<String>,
}

/// Produces the initial URLs for a search phrase
#[async_trait]
pub trait SeedProvider: Send + Sync {
    /// Returns up to `count` seed URLs; failures yield an empty list
    async fn seed_urls(&self, phrase: &str, count: usize) -> Vec<String>;
}

/// Downloads a page and extracts its links
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Returns `None` on any failure (network, timeout, non-2xx, body read)
    async fn fetch_and_extract(&self, url: &Url) -> Option<FetchedPage>;
}

/// Robots exclusion predicate
#[async_trait]
pub trait RobotsPolicy: Send + Sync {
    /// Whether `url`, served from `base_url` (`scheme://host[:port]`), may be
    /// fetched
    async fn can_fetch(&self, base_url: &str, url: &Url) -> bool;
}

/// Seed provider serving a fixed list of URLs
///
/// Every configured URL is a seed; `count` only limits searched seeds.
#[derive(Debug, Clone, Default)]
pub struct StaticSeedProvider {
    urls: Vec<String>,
}

impl StaticSeedProvider {
    pub fn new(urls: Vec<String>) -> Self {
        Self { urls }
    }
}

#[async_trait]
impl SeedProvider for StaticSeedProvider {
    async fn seed_urls(&self, _phrase: &str, _count: usize) -> Vec<String> {
        self.urls.clone()
    }
}

/// Chains two seed providers, first provider's URLs first, without duplicates
pub struct CombinedSeedProvider<A, B> {
    first: A,
    second: B,
}

impl<A, B> CombinedSeedProvider<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

#[async_trait]
impl<A, B> SeedProvider for CombinedSeedProvider<A, B>
where
    A: SeedProvider,
    B: SeedProvider,
{
    async fn seed_urls(&self, phrase: &str, count: usize) -> Vec<String> {
        let mut urls = self.first.seed_urls(phrase, count).await;
        for url in self.second.seed_urls(phrase, count).await {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        urls
    }
}

/// Robots policy that allows everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllRobots;

#[async_trait]
impl RobotsPolicy for AllowAllRobots {
    async fn can_fetch(&self, _base_url: &str, _url: &Url) -> bool {
        true
    }
}
