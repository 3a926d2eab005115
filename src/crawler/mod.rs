//! Crawler module: the crawl loop and its collaborators
//!
//! This module contains the core crawling logic, including:
//! - The crawl session and worker pool
//! - Processing of single pages (robots check, fetch, link vetting)
//! - HTTP fetching and HTML link extraction
//! - Seed discovery through a search engine

mod collaborators;
mod fetcher;
pub mod page;
mod parser;
mod scheduler;
mod seeds;

pub use collaborators::{
    AllowAllRobots, CombinedSeedProvider, FetchedPage, PageFetcher, RobotsPolicy, SeedProvider,
    StaticSeedProvider,
};
pub use fetcher::{build_http_client, HttpFetcher};
pub use parser::extract_hrefs;
pub use scheduler::{Collaborators, CrawlOutcome, CrawlSession, Scheduler};
pub use seeds::{extract_result_links, SearchSeedProvider};

use crate::config::Config;
use crate::robots::HttpRobotsPolicy;

impl Collaborators {
    /// Network-backed collaborators for a configuration
    ///
    /// Seeds are the configured URLs followed by the search results for the
    /// seed phrase.
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let timeout = config.crawler.fetch_timeout();
        let seeds = CombinedSeedProvider::new(
            StaticSeedProvider::new(config.seeds.urls.clone()),
            SearchSeedProvider::new(&config.seeds, &config.user_agent, timeout)?,
        );
        let fetcher = HttpFetcher::new(&config.user_agent, timeout)?;
        let robots = HttpRobotsPolicy::new(&config.crawler, &config.user_agent)?;

        Ok(Self::new(seeds, fetcher, robots))
    }
}

/// Runs a complete crawl against the network
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP-backed collaborators
/// 2. Seed the frontier from the search phrase and configured URLs
/// 3. Run the worker pool until the target is reached or the frontier is
///    exhausted
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlOutcome)` - Crawl completed
/// * `Err(FocalError)` - Crawl could not start or every worker failed
pub async fn crawl(config: &Config) -> crate::Result<CrawlOutcome> {
    let collaborators = Collaborators::from_config(config)?;
    Scheduler::new(config, collaborators)?.run().await
}
