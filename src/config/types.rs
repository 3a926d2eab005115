use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure for Focal-Crawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub seeds: SeedConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Order in which the frontier hands out URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrawlPolicy {
    /// Lowest `novelty - 0.001 * importance` first, with best-candidate validation
    Prioritized,
    /// Plain FIFO in discovery order
    BreadthFirst,
}

impl Default for CrawlPolicy {
    fn default() -> Self {
        Self::Prioritized
    }
}

impl fmt::Display for CrawlPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prioritized => write!(f, "prioritized"),
            Self::BreadthFirst => write!(f, "breadth-first"),
        }
    }
}

impl FromStr for CrawlPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "prioritized" => Ok(Self::Prioritized),
            "breadth-first" | "bfs" => Ok(Self::BreadthFirst),
            other => Err(format!(
                "unknown crawl policy '{}', expected 'prioritized' or 'breadth-first'",
                other
            )),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Frontier ordering policy
    #[serde(default)]
    pub policy: CrawlPolicy,

    /// Number of concurrent workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Number of report entries after which the crawl stops
    pub target: usize,

    /// How long an idle worker waits on the frontier before re-checking (milliseconds)
    #[serde(default = "default_pop_timeout_ms")]
    pub pop_timeout_ms: u64,

    /// Page fetch timeout (seconds)
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// robots.txt fetch timeout (seconds)
    #[serde(default = "default_fetch_timeout_secs")]
    pub robots_timeout_secs: u64,

    /// Per-domain robots.txt cache lifetime (seconds); 0 re-fetches for every URL
    #[serde(default)]
    pub robots_cache_ttl_secs: u64,

    /// Links found deeper than this many hops from a seed are not queued
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// How many times a panicked worker is replaced before giving up on it
    #[serde(default = "default_max_worker_restarts")]
    pub max_worker_restarts: u32,
}

impl CrawlerConfig {
    pub fn pop_timeout(&self) -> Duration {
        Duration::from_millis(self.pop_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn robots_timeout(&self) -> Duration {
        Duration::from_secs(self.robots_timeout_secs)
    }

    pub fn robots_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.robots_cache_ttl_secs)
    }
}

fn default_workers() -> usize {
    10
}

fn default_pop_timeout_ms() -> u64 {
    1000
}

fn default_fetch_timeout_secs() -> u64 {
    5
}

fn default_max_worker_restarts() -> u32 {
    3
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,

    /// Email address for crawler-related contact
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Full user agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Where the crawl starts
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SeedConfig {
    /// Search phrase handed to the seed provider
    pub phrase: String,

    /// Number of search results to use as seeds
    #[serde(default = "default_seed_count")]
    pub count: usize,

    /// HTML search endpoint queried with `?q=<phrase>`
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Extra seed URLs crawled in addition to the search results
    #[serde(default)]
    pub urls: Vec<String>,
}

fn default_seed_count() -> usize {
    5
}

fn default_search_url() -> String {
    "https://html.duckduckgo.com/html/".to_string()
}

/// Output configuration; every sink is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// CSV crawl log
    pub csv_path: Option<String>,

    /// JSON crawl log
    pub json_path: Option<String>,

    /// SQLite database receiving the crawl log
    pub database_path: Option<String>,

    /// JSON map of domain -> pages crawled
    pub domains_path: Option<String>,
}
