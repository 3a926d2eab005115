//! URL records: the unit of work that moves through the frontier
//!
//! A record is built once from a raw URL and keeps its decomposition
//! (normalized URL, domain, path segments, query) for its whole life. Only the
//! scoring fields and the crawl outcome change afterwards.

use crate::url::{base_url, extract_domain, normalize_url};
use crate::UrlError;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use url::Url;

/// Weight of importance against novelty in the priority formula
pub const IMPORTANCE_DAMPING: f64 = 0.001;

/// A discovered URL together with its scores and crawl outcome
///
/// Cloning a record keeps the validity flag shared: the clone stands for the
/// same queued entry and is tombstoned together with the original. Use
/// [`UrlRecord::superseding_copy`] to create a replacement with its own flag.
#[derive(Debug, Clone)]
pub struct UrlRecord {
    raw_url: String,
    url: Url,
    domain: String,
    base_url: String,
    segments: Vec<String>,
    query: String,
    query_key: Option<String>,

    /// Hops from the seed this record was reached from
    pub depth: u32,

    novelty: f64,
    importance: f64,
    priority: f64,
    valid: Arc<AtomicBool>,

    /// HTTP status of the fetch, `None` if it failed or never happened
    pub response_code: Option<u16>,

    /// Body size in bytes
    pub size: Option<u64>,

    /// When the page was fetched
    pub fetched_at: Option<DateTime<Utc>>,

    /// robots.txt disallowed the fetch
    pub denied_by_robot_exclusion: bool,
}

impl UrlRecord {
    /// Builds a record from a raw URL
    ///
    /// # Arguments
    ///
    /// * `raw_url` - The URL as it was found (seed or vetted href)
    /// * `depth` - Hops from the seed
    ///
    /// # Returns
    ///
    /// * `Ok(UrlRecord)` - A valid record with zero scores
    /// * `Err(UrlError)` - The URL cannot be parsed or has no host
    pub fn new(raw_url: &str, depth: u32) -> Result<Self, UrlError> {
        let url = normalize_url(raw_url)?;
        let domain = extract_domain(&url).ok_or(UrlError::MissingDomain)?;
        let base_url = base_url(&url).ok_or(UrlError::MissingDomain)?;

        let segments = url
            .path_segments()
            .map(|segments| {
                segments
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let query = url.query().unwrap_or_default().to_string();
        let query_key = (!query.is_empty()).then(|| format!("?{}", query));

        Ok(Self {
            raw_url: raw_url.to_string(),
            url,
            domain,
            base_url,
            segments,
            query,
            query_key,
            depth,
            novelty: 0.0,
            importance: 0.0,
            priority: 0.0,
            valid: Arc::new(AtomicBool::new(true)),
            response_code: None,
            size: None,
            fetched_at: None,
            denied_by_robot_exclusion: false,
        })
    }

    pub fn raw_url(&self) -> &str {
        &self.raw_url
    }

    /// The normalized URL, which is the record's identity
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// `scheme://domain` of this record
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Non-empty path segments in order
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Query string without the leading `?`, empty if absent
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Key sequence of this record in a prefix trie: domain, each path
    /// segment, then the query prefixed with `?` when there is one
    ///
    /// A literal `?` in a path segment is percent-encoded, so the query key
    /// never collides with a segment. The scheme is not part of the path;
    /// `http` and `https` forms of a URL share their trie nodes.
    pub fn trie_path(&self) -> Vec<&str> {
        let mut path = Vec::with_capacity(self.segments.len() + 2);
        path.push(self.domain.as_str());
        path.extend(self.segments.iter().map(String::as_str));
        if let Some(key) = &self.query_key {
            path.push(key.as_str());
        }
        path
    }

    pub fn novelty(&self) -> f64 {
        self.novelty
    }

    pub fn importance(&self) -> f64 {
        self.importance
    }

    /// `novelty - 0.001 * importance`; lower values are crawled first
    pub fn priority(&self) -> f64 {
        self.priority
    }

    pub fn update_novelty(&mut self, novelty: f64) {
        self.novelty = novelty;
        self.update_priority();
    }

    pub fn update_importance(&mut self, importance: f64) {
        self.importance = importance;
        self.update_priority();
    }

    fn update_priority(&mut self) {
        self.priority = self.novelty - IMPORTANCE_DAMPING * self.importance;
    }

    /// Whether the queued entry this record stands for is still live
    pub fn is_valid(&self) -> bool {
        self.valid.load(AtomicOrdering::Acquire)
    }

    /// Tombstones this record and every clone sharing its flag
    pub fn invalidate(&self) {
        self.valid.store(false, AtomicOrdering::Release);
    }

    /// Deep copy with a fresh validity flag, used to replace a queued entry
    pub fn superseding_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.valid = Arc::new(AtomicBool::new(true));
        copy
    }

    /// Whether both records stand for the same queued entry
    pub fn same_entry(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.valid, &other.valid)
    }

    /// Compares by priority, lowest first
    pub fn cmp_priority(&self, other: &Self) -> Ordering {
        self.priority.total_cmp(&other.priority)
    }
}
