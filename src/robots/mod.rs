//! Robots.txt handling module
//!
//! This module provides functionality for fetching, interpreting and
//! optionally caching robots.txt files:
//! - `401`/`403` on robots.txt denies the whole host
//! - any other failure (network error, timeout, non-success status) allows it
//! - with a zero cache TTL, robots.txt is fetched again for every URL

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache};
pub use parser::RobotsRules;

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::crawler::{build_http_client, RobotsPolicy};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// Fetches robots.txt for a host and maps the response to rules
///
/// # Arguments
///
/// * `client` - HTTP client carrying the robots timeout
/// * `base_url` - `scheme://host[:port]` of the host
pub async fn fetch_robots(client: &Client, base_url: &str) -> RobotsRules {
    let robots_url = format!("{}/robots.txt", base_url.trim_end_matches('/'));

    let response = match client.get(&robots_url).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Could not fetch {}: {}; allowing all", robots_url, e);
            return RobotsRules::AllowAll;
        }
    };

    let status = response.status().as_u16();
    let body = if response.status().is_success() {
        response.text().await.unwrap_or_default()
    } else {
        String::new()
    };

    let rules = RobotsRules::from_response(status, &body);
    tracing::trace!("{} answered {}: {:?}", robots_url, status, rules);
    rules
}

/// Robots policy that consults the live robots.txt of each host
#[derive(Debug)]
pub struct HttpRobotsPolicy {
    client: Client,
    agent: String,
    cache: Option<RobotsCache>,
}

impl HttpRobotsPolicy {
    /// # Arguments
    ///
    /// * `crawler` - Supplies the robots timeout and cache TTL
    /// * `user_agent` - The crawler name is the token matched in robots.txt
    pub fn new(crawler: &CrawlerConfig, user_agent: &UserAgentConfig) -> crate::Result<Self> {
        let ttl = crawler.robots_cache_ttl();
        Ok(Self {
            client: build_http_client(user_agent, crawler.robots_timeout())?,
            agent: user_agent.crawler_name.clone(),
            cache: (!ttl.is_zero()).then(|| RobotsCache::new(ttl)),
        })
    }

    async fn rules_for(&self, base_url: &str) -> RobotsRules {
        if let Some(rules) = self.cache.as_ref().and_then(|cache| cache.get(base_url)) {
            return rules;
        }

        let rules = fetch_robots(&self.client, base_url).await;
        if let Some(cache) = &self.cache {
            cache.insert(base_url, rules.clone());
        }
        rules
    }
}

#[async_trait]
impl RobotsPolicy for HttpRobotsPolicy {
    async fn can_fetch(&self, base_url: &str, url: &Url) -> bool {
        let allowed = self.rules_for(base_url).await.is_allowed(url.as_str(), &self.agent);
        if !allowed {
            tracing::debug!("robots.txt disallows {}", url);
        }
        allowed
    }
}
