//! Report sink trait and output errors

use crate::output::report::ReportEntry;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for a finished crawl report
///
/// The crawl core only produces the ordered entries; sinks decide how they
/// are persisted.
pub trait ReportSink {
    /// Short name used in log lines
    fn name(&self) -> &str;

    /// Writes the full report
    fn write_report(&self, entries: &[ReportEntry]) -> OutputResult<()>;
}
