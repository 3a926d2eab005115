//! Output module for crawl reports
//!
//! This module handles:
//! - Collecting crawled pages into a bounded report
//! - Writing the report to CSV, JSON and SQLite sinks
//! - Summarizing the report as statistics and a per-domain histogram

mod file_sinks;
mod report;
mod sqlite_sink;
pub mod stats;
mod traits;

pub use file_sinks::{CsvReportSink, DomainSummarySink, JsonReportSink};
pub use report::{Append, CrawlReport, ReportEntry};
pub use sqlite_sink::{load_latest_report, SqliteReportSink};
pub use stats::{compute_statistics, domain_histogram, print_statistics, CrawlStatistics};
pub use traits::{OutputError, OutputResult, ReportSink};

use crate::config::OutputConfig;

/// Builds the sinks enabled in the output configuration
///
/// # Arguments
///
/// * `config` - The `[output]` section
/// * `config_hash` - Stored alongside the SQLite report
pub fn build_sinks(config: &OutputConfig, config_hash: &str) -> Vec<Box<dyn ReportSink>> {
    let mut sinks: Vec<Box<dyn ReportSink>> = Vec::new();

    if let Some(path) = &config.csv_path {
        sinks.push(Box::new(CsvReportSink::new(path)));
    }
    if let Some(path) = &config.json_path {
        sinks.push(Box::new(JsonReportSink::new(path)));
    }
    if let Some(path) = &config.database_path {
        sinks.push(Box::new(SqliteReportSink::new(path, config_hash)));
    }
    if let Some(path) = &config.domains_path {
        sinks.push(Box::new(DomainSummarySink::new(path)));
    }

    sinks
}

/// Writes the report to every configured sink
///
/// A failing sink is logged and skipped; the error of the first failure is
/// returned after all sinks were tried.
pub fn write_outputs(
    config: &OutputConfig,
    entries: &[ReportEntry],
    config_hash: &str,
) -> OutputResult<()> {
    let mut first_error = None;

    for sink in build_sinks(config, config_hash) {
        match sink.write_report(entries) {
            Ok(()) => tracing::info!(sink = sink.name(), pages = entries.len(), "Report written"),
            Err(e) => {
                tracing::warn!(sink = sink.name(), "Failed to write report: {}", e);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
