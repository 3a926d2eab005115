//! Focal-Crawl: a novelty-driven focused web crawler
//!
//! This crate implements a crawler that, starting from the results of a search
//! phrase, fetches pages in priority order. Each discovered URL is scored by how
//! much of its path prefix has already been explored (novelty) and by how often,
//! and from how many other domains, its prefix has been linked (importance).

pub mod config;
pub mod crawler;
pub mod frontier;
pub mod output;
pub mod robots;
pub mod url;

use thiserror::Error;

/// Main error type for Focal-Crawl operations
#[derive(Debug, Error)]
pub enum FocalError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker pool failure: {0}")]
    WorkerPool(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
///
/// Raised while turning a raw href or seed into a URL record. Callers in the
/// crawl loop drop the offending link instead of failing the worker.
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Focal-Crawl operations
pub type Result<T> = std::result::Result<T, FocalError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlOutcome, Scheduler};
pub use frontier::{FrontierQueue, PrefixTrie, UrlRecord};
pub use output::{CrawlReport, ReportEntry};
pub use url::normalize_url;
