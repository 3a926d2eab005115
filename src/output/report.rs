//! The crawl report: one entry per crawled page, capped at the crawl target

use crate::frontier::UrlRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Outcome of one crawled page as handed to report sinks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    /// Normalized URL
    pub url: String,

    /// When the page was fetched; `None` if the fetch failed
    pub timestamp: Option<DateTime<Utc>>,

    /// Body size in bytes
    pub size: Option<u64>,

    /// HTTP status code; `None` if the fetch failed
    pub response_code: Option<u16>,

    /// Hops from the seed
    pub depth: u32,

    /// Priority the page was dequeued with
    pub priority: f64,

    pub domain: String,
}

impl From<&UrlRecord> for ReportEntry {
    fn from(record: &UrlRecord) -> Self {
        Self {
            url: record.url().to_string(),
            timestamp: record.fetched_at,
            size: record.size,
            response_code: record.response_code,
            depth: record.depth,
            priority: record.priority(),
            domain: record.domain().to_string(),
        }
    }
}

/// Result of offering an entry to the report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Append {
    /// The entry was stored; `full` is true if it took the last slot
    Accepted { full: bool },
    /// The report was already full
    Rejected,
}

/// Append-only, concurrency-safe list of crawled pages
///
/// The report never grows past its target: appends are checked and stored
/// under one lock, so racing workers cannot overshoot.
#[derive(Debug)]
pub struct CrawlReport {
    target: usize,
    entries: Mutex<Vec<ReportEntry>>,
}

impl CrawlReport {
    pub fn new(target: usize) -> Self {
        Self {
            target,
            entries: Mutex::new(Vec::with_capacity(target.min(4096))),
        }
    }

    pub fn target(&self) -> usize {
        self.target
    }

    /// Stores `entry` unless the report is already full
    pub fn append(&self, entry: ReportEntry) -> Append {
        let mut entries = self.lock();
        if entries.len() >= self.target {
            return Append::Rejected;
        }
        entries.push(entry);
        Append::Accepted {
            full: entries.len() >= self.target,
        }
    }

    /// The crawl's termination condition
    pub fn is_full(&self) -> bool {
        self.lock().len() >= self.target
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the entries in append order
    pub fn snapshot(&self) -> Vec<ReportEntry> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ReportEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
