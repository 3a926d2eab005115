//! Configuration module for Focal-Crawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use focal_crawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawler will stop after {} pages", config.crawler.target);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlPolicy, CrawlerConfig, OutputConfig, SeedConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};

pub use validation::validate;
