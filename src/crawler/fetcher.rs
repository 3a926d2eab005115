//! HTTP fetcher implementation
//!
//! This module handles all page downloads for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests bounded by the configured fetch timeout
//! - Turning every kind of failure into "no page"

use crate::config::UserAgentConfig;
use crate::crawler::collaborators::{FetchedPage, PageFetcher};
use crate::crawler::parser::extract_hrefs;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Total request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use focal_crawl::config::UserAgentConfig;
/// use focal_crawl::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "FocalCrawl".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(5)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page fetcher backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config, timeout)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_and_extract(&self, url: &Url) -> Option<FetchedPage> {
        let response = match self.client.get(url.as_str()).send().await {
            Ok(response) => response,
            Err(e) => {
                if e.is_timeout() {
                    tracing::debug!("Timed out fetching {}", url);
                } else {
                    tracing::debug!("Failed to fetch {}: {}", url, e);
                }
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Fetching {} returned {}", url, status);
            return None;
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("Failed to read body of {}: {}", url, e);
                return None;
            }
        };
        let fetched_at = Utc::now();
        let hrefs = extract_hrefs(&String::from_utf8_lossy(&body));

        Some(FetchedPage {
            response_code: status.as_u16(),
            fetched_at,
            size: body.len() as u64,
            hrefs,
        })
    }
}
