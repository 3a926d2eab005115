//! URL handling module for Focal-Crawl
//!
//! This module provides URL normalization, domain extraction and the vetting
//! rules applied to raw hrefs mined from fetched pages.

mod domain;
mod normalize;
mod vet;

// Re-export main functions
pub use domain::{base_url, extract_domain};
pub use normalize::normalize_url;
pub use vet::{has_skipped_extension, vet_href, SKIPPED_EXTENSIONS};
