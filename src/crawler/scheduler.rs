//! Crawl session and worker pool
//!
//! This module handles:
//! - The shared crawl state: frontier queue, frontier trie, explored trie and
//!   report, each behind its own guard
//! - Best-candidate validation when popping in prioritized mode
//! - The per-worker fetch, score and re-enqueue loop
//! - Supervision of worker tasks, restarting workers that panic
//!
//! A worker never holds the frontier trie guard and the explored trie guard at
//! the same time.

use crate::config::{Config, CrawlPolicy, CrawlerConfig};
use crate::crawler::collaborators::{PageFetcher, RobotsPolicy, SeedProvider};
use crate::crawler::page;
use crate::frontier::{scoring, FrontierQueue, PrefixTrie, UrlRecord};
use crate::output::{Append, CrawlReport, ReportEntry};
use crate::{ConfigError, FocalError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Upper bound on peek-ahead comparisons per pop
const MAX_VALIDATION_ROUNDS: usize = 32;

/// Progress is logged every this many report entries
const PROGRESS_INTERVAL: usize = 10;

/// The external services a crawl depends on
#[derive(Clone)]
pub struct Collaborators {
    pub seeds: Arc<dyn SeedProvider>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub robots: Arc<dyn RobotsPolicy>,
}

impl Collaborators {
    pub fn new(
        seeds: impl SeedProvider + 'static,
        fetcher: impl PageFetcher + 'static,
        robots: impl RobotsPolicy + 'static,
    ) -> Self {
        Self {
            seeds: Arc::new(seeds),
            fetcher: Arc::new(fetcher),
            robots: Arc::new(robots),
        }
    }
}

/// Marks the record a worker popped as finished when dropped, also when the
/// worker unwinds
struct InFlight<'a>(&'a FrontierQueue);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.complete();
    }
}

/// Processed pages: the trie novelty is scored against, plus their URLs
#[derive(Debug, Default)]
struct Explored {
    trie: PrefixTrie,
    urls: HashSet<String>,
}

/// Shared state of one crawl
#[derive(Debug)]
pub struct CrawlSession {
    config: CrawlerConfig,
    queue: FrontierQueue,
    frontier: Mutex<PrefixTrie>,
    explored: Mutex<Explored>,
    report: CrawlReport,
    pages_processed: AtomicUsize,
    robots_denied: AtomicUsize,
}

impl CrawlSession {
    pub fn new(config: CrawlerConfig) -> Self {
        Self {
            queue: FrontierQueue::new(config.policy),
            frontier: Mutex::new(PrefixTrie::new()),
            explored: Mutex::new(Explored::default()),
            report: CrawlReport::new(config.target),
            pages_processed: AtomicUsize::new(0),
            robots_denied: AtomicUsize::new(0),
            config,
        }
    }

    pub fn queue(&self) -> &FrontierQueue {
        &self.queue
    }

    pub fn report(&self) -> &CrawlReport {
        &self.report
    }

    /// Either the report reached its target or the frontier ran dry
    pub fn is_finished(&self) -> bool {
        self.report.is_full() || self.queue.is_drained()
    }

    /// Merges discovered links into the frontier trie and queues the results
    ///
    /// # Arguments
    ///
    /// * `page` - The page the links were found on; `None` for seeds
    /// * `links` - Unscored records for the links
    ///
    /// # Returns
    ///
    /// The number of records pushed, superseding copies included
    pub fn enqueue_links(&self, page: Option<&UrlRecord>, links: Vec<UrlRecord>) -> usize {
        let updated: Vec<UrlRecord> = {
            let mut frontier = self.lock_frontier();
            links
                .into_iter()
                .flat_map(|link| scoring::merge_into_frontier(&mut frontier, link, page))
                .collect()
        };

        let pushed = updated.len();
        for record in updated {
            self.queue.push(record);
        }
        pushed
    }

    /// Frontier trie count at `path`, if the node exists
    pub fn frontier_count_at(&self, path: &[&str]) -> Option<u64> {
        self.lock_frontier().count_at(path)
    }

    /// The record currently queued for `path`
    pub fn frontier_record_at(&self, path: &[&str]) -> Option<UrlRecord> {
        self.lock_frontier().current_record_at(path).cloned()
    }

    pub fn frontier_node_count(&self) -> usize {
        self.lock_frontier().node_count()
    }

    pub fn explored_node_count(&self) -> usize {
        self.lock_explored().trie.node_count()
    }

    /// Whether the record's URL has been processed
    pub fn is_explored(&self, record: &UrlRecord) -> bool {
        self.lock_explored().urls.contains(record.url().as_str())
    }

    /// Recomputes the record's novelty against the explored trie
    fn refresh(&self, mut record: UrlRecord) -> UrlRecord {
        let novelty = scoring::novelty(&record, &self.lock_explored().trie);
        record.update_novelty(novelty);
        record
    }

    /// Pops the next record to process
    ///
    /// Breadth-first mode pops plainly. Prioritized mode compares the
    /// refreshed best candidate with the refreshed runner-up and keeps the
    /// better one, putting the other back.
    async fn next_candidate(&self) -> Option<UrlRecord> {
        let first = self.queue.pop_blocking(self.config.pop_timeout()).await?;
        if self.queue.policy() == CrawlPolicy::BreadthFirst {
            return Some(first);
        }

        let mut incumbent = self.refresh(first);
        for _ in 0..MAX_VALIDATION_ROUNDS {
            let Some(challenger) = self.queue.try_pop() else {
                break;
            };
            let challenger = self.refresh(challenger);

            if incumbent.priority() <= challenger.priority() {
                self.requeue_refreshed(challenger);
                break;
            }
            tracing::trace!(
                "{} ({}) overtakes {} ({})",
                challenger.url(),
                challenger.priority(),
                incumbent.url(),
                incumbent.priority()
            );
            self.requeue_refreshed(incumbent);
            incumbent = challenger;
        }
        Some(incumbent)
    }

    /// Puts a refreshed record back, keeping the frontier trie pointing at it
    ///
    /// A record superseded while it was out of the queue is dropped.
    fn requeue_refreshed(&self, record: UrlRecord) {
        let current = {
            let mut frontier = self.lock_frontier();
            let current = record.is_valid()
                && frontier
                    .current_record_for(&record)
                    .is_some_and(|pending| pending.same_entry(&record));
            if current {
                frontier.set_record_for(record.clone());
            }
            current
        };

        if current {
            self.queue.requeue(record);
        } else {
            tracing::trace!("Dropping superseded entry for {}", record.url());
            self.queue.complete();
        }
    }

    /// Takes ownership of the record's URL for processing
    ///
    /// Fails if the record was superseded after it was popped or another
    /// worker already took the URL.
    fn claim(&self, record: &UrlRecord) -> bool {
        let mut frontier = self.lock_frontier();
        let current = record.is_valid()
            && frontier
                .current_record_for(record)
                .is_some_and(|pending| pending.same_entry(record));
        if current {
            frontier.claim(record);
        }
        current
    }

    /// Records the outcome of a processed page
    ///
    /// The page enters the report unless robots.txt denied it, is recorded as
    /// explored either way, and its links are merged into the frontier.
    fn finish_page(&self, record: &UrlRecord, links: Vec<UrlRecord>) {
        self.pages_processed.fetch_add(1, Ordering::Relaxed);

        if record.denied_by_robot_exclusion {
            self.robots_denied.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Skipping {} in report: denied by robots.txt", record.url());
        } else {
            match self.report.append(ReportEntry::from(record)) {
                Append::Accepted { full } => {
                    let crawled = self.report.len();
                    if full {
                        tracing::info!("Reached target of {} pages", self.report.target());
                    } else if crawled % PROGRESS_INTERVAL == 0 {
                        tracing::info!(
                            "Crawled {} / {} pages ({} queued)",
                            crawled,
                            self.report.target(),
                            self.queue.len()
                        );
                    }
                }
                Append::Rejected => {
                    tracing::debug!("Report already full, not recording {}", record.url());
                }
            }
        }

        {
            let mut explored = self.lock_explored();
            explored.trie.record_path(record.trie_path().as_slice(), 1);
            explored.urls.insert(record.url().to_string());
        }

        let pushed = self.enqueue_links(Some(record), links);
        tracing::debug!("Processed {} (depth {}), queued {} records", record.url(), record.depth, pushed);
    }

    fn lock_frontier(&self) -> MutexGuard<'_, PrefixTrie> {
        self.frontier.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_explored(&self) -> MutexGuard<'_, Explored> {
        self.explored.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Summary of a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Report entries in append order
    pub entries: Vec<ReportEntry>,

    /// Pages taken off the frontier and processed, denied and failed included
    pub pages_processed: usize,

    /// Pages skipped because robots.txt disallowed them
    pub robots_denied: usize,

    /// Workers replaced after a panic
    pub worker_restarts: u32,

    /// True if the frontier ran dry before the target was reached
    pub exhausted: bool,

    pub frontier_nodes: usize,
    pub explored_nodes: usize,
    pub elapsed: Duration,
}

/// Runs a crawl: seeds the frontier, then drives a pool of workers until the
/// report is full or the frontier is exhausted
pub struct Scheduler {
    session: Arc<CrawlSession>,
    collaborators: Collaborators,
    phrase: String,
    seed_count: usize,
}

impl Scheduler {
    /// Creates a scheduler for `config`
    ///
    /// # Returns
    ///
    /// * `Ok(Scheduler)` - Ready to run
    /// * `Err(FocalError)` - Zero workers, zero target or an empty seed phrase
    pub fn new(config: &Config, collaborators: Collaborators) -> crate::Result<Self> {
        if config.crawler.workers == 0 {
            return Err(ConfigError::Validation("workers must be at least 1".to_string()).into());
        }
        if config.crawler.target == 0 {
            return Err(ConfigError::Validation("target must be at least 1".to_string()).into());
        }
        if config.seeds.phrase.trim().is_empty() {
            return Err(ConfigError::Validation("seed phrase cannot be empty".to_string()).into());
        }

        Ok(Self {
            session: Arc::new(CrawlSession::new(config.crawler.clone())),
            collaborators,
            phrase: config.seeds.phrase.clone(),
            seed_count: config.seeds.count,
        })
    }

    /// Shared state, for inspection during or after the crawl
    pub fn session(&self) -> Arc<CrawlSession> {
        Arc::clone(&self.session)
    }

    /// Queues the seed provider's URLs at depth 0
    ///
    /// # Returns
    ///
    /// The number of seeds queued; malformed seeds are dropped
    pub async fn seed(&self) -> usize {
        let urls = self
            .collaborators
            .seeds
            .seed_urls(&self.phrase, self.seed_count)
            .await;

        let records: Vec<UrlRecord> = urls
            .iter()
            .filter_map(|raw| match UrlRecord::new(raw, 0) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::debug!("Dropping seed {}: {}", raw, e);
                    None
                }
            })
            .collect();

        let queued = self.session.enqueue_links(None, records);
        tracing::info!("Seeded frontier with {} URLs for '{}'", queued, self.phrase);
        queued
    }

    /// Seeds the frontier and crawls until done
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - The crawl finished (possibly short of target if
    ///   the frontier ran dry)
    /// * `Err(FocalError)` - Every worker died before the crawl could finish
    pub async fn run(self) -> crate::Result<CrawlOutcome> {
        let started = Instant::now();
        self.seed().await;

        let config = &self.session.config;
        tracing::info!(
            "Starting crawl: {} workers, target {}, policy {}",
            config.workers,
            config.target,
            config.policy
        );

        let mut workers = JoinSet::new();
        for id in 0..config.workers {
            workers.spawn(run_worker(self.session(), self.collaborators.clone(), id));
        }

        let mut next_id = config.workers;
        let mut restarts: u32 = 0;
        let mut clean_exits = 0;

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(()) => clean_exits += 1,
                Err(e) if e.is_panic() => {
                    if self.session.is_finished() {
                        tracing::warn!("Worker panicked after the crawl finished");
                    } else if restarts < config.max_worker_restarts {
                        restarts += 1;
                        tracing::warn!(
                            "Worker panicked, starting replacement ({}/{})",
                            restarts,
                            config.max_worker_restarts
                        );
                        workers.spawn(run_worker(self.session(), self.collaborators.clone(), next_id));
                        next_id += 1;
                    } else {
                        tracing::warn!("Worker panicked, restart budget exhausted");
                    }
                }
                Err(e) => return Err(FocalError::WorkerPool(e.to_string())),
            }
        }

        if clean_exits == 0 && !self.session.is_finished() {
            return Err(FocalError::WorkerPool(
                "all workers panicked before the crawl finished".to_string(),
            ));
        }

        let session = &self.session;
        let entries = session.report.snapshot();
        let exhausted = entries.len() < session.report.target();
        if exhausted {
            tracing::info!(
                "Frontier exhausted after {} of {} pages",
                entries.len(),
                session.report.target()
            );
        }

        let outcome = CrawlOutcome {
            pages_processed: session.pages_processed.load(Ordering::Relaxed),
            robots_denied: session.robots_denied.load(Ordering::Relaxed),
            worker_restarts: restarts,
            exhausted,
            frontier_nodes: session.frontier_node_count(),
            explored_nodes: session.explored_node_count(),
            elapsed: started.elapsed(),
            entries,
        };
        tracing::info!(
            "Crawl finished: {} pages in report, {} processed, {:.1}s",
            outcome.entries.len(),
            outcome.pages_processed,
            outcome.elapsed.as_secs_f64()
        );
        Ok(outcome)
    }
}

/// One worker: pop, claim, process, record, until the crawl is finished
///
/// The finish condition is checked once per page, after the page's outcome,
/// explored entry and links have all been recorded.
async fn run_worker(session: Arc<CrawlSession>, collaborators: Collaborators, id: usize) {
    tracing::debug!(worker = id, "Worker started");
    let max_depth = session.config.max_depth;

    while !session.is_finished() {
        let Some(candidate) = session.next_candidate().await else {
            continue;
        };
        if session.report.is_full() {
            // the report filled while this worker waited on the queue
            session.requeue_refreshed(candidate);
            break;
        }
        let _in_flight = InFlight(&session.queue);

        if session.is_explored(&candidate) {
            tracing::trace!(worker = id, "{} already explored", candidate.url());
            continue;
        }
        if !session.claim(&candidate) {
            tracing::trace!(worker = id, "{} superseded or taken", candidate.url());
            continue;
        }

        let mut record = candidate;
        let links = page::process(
            &mut record,
            collaborators.robots.as_ref(),
            collaborators.fetcher.as_ref(),
            max_depth,
        )
        .await;
        session.finish_page(&record, links);
    }

    tracing::debug!(worker = id, "Worker stopped");
}
