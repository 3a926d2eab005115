//! Seed URLs from an HTML search engine
//!
//! The search endpoint is queried with `?q=<phrase>` and the result page is
//! scraped for outbound links. Redirect links of the form
//! `/l/?uddg=<encoded target>` (as served by DuckDuckGo's HTML frontend) are
//! unwrapped to their target.

use crate::config::{SeedConfig, UserAgentConfig};
use crate::crawler::collaborators::SeedProvider;
use crate::crawler::fetcher::build_http_client;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

/// Seed provider that scrapes a search engine result page
#[derive(Debug, Clone)]
pub struct SearchSeedProvider {
    client: Client,
    search_url: Url,
}

impl SearchSeedProvider {
    /// # Arguments
    ///
    /// * `seeds` - Supplies the search endpoint
    /// * `user_agent` - Identification sent with the search request
    /// * `timeout` - Request timeout
    pub fn new(
        seeds: &SeedConfig,
        user_agent: &UserAgentConfig,
        timeout: Duration,
    ) -> crate::Result<Self> {
        let search_url = Url::parse(&seeds.search_url)
            .map_err(|e| crate::ConfigError::InvalidUrl(format!("{}: {}", seeds.search_url, e)))?;
        Ok(Self {
            client: build_http_client(user_agent, timeout)?,
            search_url,
        })
    }

    async fn search(&self, phrase: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(self.search_url.clone())
            .query(&[("q", phrase)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl SeedProvider for SearchSeedProvider {
    async fn seed_urls(&self, phrase: &str, count: usize) -> Vec<String> {
        match self.search(phrase).await {
            Ok(html) => {
                let urls = extract_result_links(&html, &self.search_url, count);
                tracing::info!("Search for '{}' yielded {} seed URLs", phrase, urls.len());
                urls
            }
            Err(e) => {
                tracing::warn!("Seed search for '{}' failed: {}", phrase, e);
                Vec::new()
            }
        }
    }
}

/// Pulls up to `count` distinct result URLs out of a search result page
///
/// Links back into the search engine itself are skipped.
pub fn extract_result_links(html: &str, search_url: &Url, count: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut urls: Vec<String> = Vec::new();
    for element in document.select(&selector) {
        if urls.len() >= count {
            break;
        }
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(target) = resolve_result_link(href, search_url) else {
            continue;
        };
        if !urls.contains(&target) {
            urls.push(target);
        }
    }
    urls
}

fn resolve_result_link(href: &str, search_url: &Url) -> Option<String> {
    let link = search_url.join(href.trim()).ok()?;

    if let Some((_, target)) = link.query_pairs().find(|(key, _)| key == "uddg") {
        let target = Url::parse(&target).ok()?;
        return is_web_url(&target).then(|| target.to_string());
    }

    if !is_web_url(&link) || link.host_str() == search_url.host_str() {
        return None;
    }
    Some(link.to_string())
}

fn is_web_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.host_str().is_some()
}
