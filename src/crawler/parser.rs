//! HTML link extraction
//!
//! Only raw `href` values are collected here. Deciding which of them are
//! worth crawling, and resolving root-relative ones, is the job of
//! [`crate::url::vet_href`].

use scraper::{Html, Selector};
use std::collections::HashSet;

/// Extracts the distinct `<a href>` values of a document in document order
///
/// # Arguments
///
/// * `html` - The HTML content to parse
///
/// # Returns
///
/// The raw, trimmed href strings; empty hrefs are skipped
///
/// # Example
///
/// ```
/// use focal_crawl::crawler::extract_hrefs;
///
/// let html = r#"<html><body><a href="/page">Link</a><a href="/page">Again</a></body></html>"#;
/// assert_eq!(extract_hrefs(html), vec!["/page".to_string()]);
/// ```
pub fn extract_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut hrefs = Vec::new();

    let Ok(selector) = Selector::parse("a[href]") else {
        return hrefs;
    };

    for element in document.select(&selector) {
        if let Some(href) = element.value().attr("href") {
            let href = href.trim();
            if !href.is_empty() && seen.insert(href.to_string()) {
                hrefs.push(href.to_string());
            }
        }
    }

    hrefs
}
