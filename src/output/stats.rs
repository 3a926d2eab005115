//! Statistics computed from a finished crawl report

use crate::output::report::ReportEntry;
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlStatistics {
    /// Number of report entries
    pub total_pages: usize,

    /// Entries whose fetch returned a status code
    pub fetched_pages: usize,

    /// Entries whose fetch failed outright
    pub failed_fetches: usize,

    /// Number of unique domains crawled
    pub unique_domains: usize,

    /// Total bytes downloaded
    pub total_bytes: u64,

    /// Deepest page in the report
    pub max_depth: u32,

    /// Pages per domain, most crawled first
    pub domain_counts: Vec<(String, usize)>,
}

/// Counts pages per domain, most crawled first; ties by domain name
pub fn domain_histogram(entries: &[ReportEntry]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for entry in entries {
        *counts.entry(entry.domain.as_str()).or_default() += 1;
    }

    let mut histogram: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(domain, count)| (domain.to_string(), count))
        .collect();
    histogram.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    histogram
}

/// Summarizes a report
pub fn compute_statistics(entries: &[ReportEntry]) -> CrawlStatistics {
    let fetched_pages = entries
        .iter()
        .filter(|entry| entry.response_code.is_some())
        .count();
    let domain_counts = domain_histogram(entries);

    CrawlStatistics {
        total_pages: entries.len(),
        fetched_pages,
        failed_fetches: entries.len() - fetched_pages,
        unique_domains: domain_counts.len(),
        total_bytes: entries.iter().filter_map(|entry| entry.size).sum(),
        max_depth: entries.iter().map(|entry| entry.depth).max().unwrap_or(0),
        domain_counts,
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
/// * `top` - How many domains to list
pub fn print_statistics(stats: &CrawlStatistics, top: usize) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages crawled: {}", stats.total_pages);
    println!("  Unique domains: {}", stats.unique_domains);
    println!("  Bytes downloaded: {}", stats.total_bytes);
    println!("  Deepest page: {}", stats.max_depth);
    println!();

    let success_rate = if stats.total_pages > 0 {
        (stats.fetched_pages as f64 / stats.total_pages as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Fetch Success Rate: {:.1}% ({} / {} pages, {} failed)",
        success_rate, stats.fetched_pages, stats.total_pages, stats.failed_fetches
    );

    if !stats.domain_counts.is_empty() {
        println!();
        println!("Top Domains:");
        for (domain, count) in stats.domain_counts.iter().take(top) {
            let percentage = (*count as f64 / stats.total_pages as f64) * 100.0;
            println!("  {}: {} ({:.1}%)", domain, count, percentage);
        }
    }
}
