//! Concurrent frontier queue
//!
//! A min-heap of URL records shared by all workers. Entries are never updated
//! in place: a record whose score changes is tombstoned and a superseding copy
//! is pushed. Tombstoned entries are dropped lazily when they reach the top.
//!
//! The queue also tracks how many popped records are still being worked on,
//! which lets idle workers tell "nothing queued right now" apart from "nothing
//! will ever be queued again".

use crate::config::CrawlPolicy;
use crate::frontier::record::UrlRecord;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// A record in the heap together with its ordering key
#[derive(Debug)]
struct QueueEntry {
    rank: f64,
    seq: u64,
    record: UrlRecord,
}

// BinaryHeap is a max-heap: reverse both keys so the lowest rank, then the
// oldest entry, is popped first
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .rank
            .total_cmp(&self.rank)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

#[derive(Debug, Default)]
struct QueueState {
    heap: BinaryHeap<QueueEntry>,
    next_seq: u64,
    in_flight: usize,
}

impl QueueState {
    fn is_drained(&self) -> bool {
        self.heap.is_empty() && self.in_flight == 0
    }
}

/// Priority queue of URL records with blocking pop and lazy tombstone removal
#[derive(Debug)]
pub struct FrontierQueue {
    policy: CrawlPolicy,
    state: Mutex<QueueState>,
    available: Notify,
}

impl FrontierQueue {
    /// Creates an empty queue
    ///
    /// With [`CrawlPolicy::Prioritized`] records leave in ascending priority;
    /// with [`CrawlPolicy::BreadthFirst`] they leave in insertion order.
    pub fn new(policy: CrawlPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(QueueState::default()),
            available: Notify::new(),
        }
    }

    pub fn policy(&self) -> CrawlPolicy {
        self.policy
    }

    /// Inserts a record without blocking
    pub fn push(&self, record: UrlRecord) {
        {
            let mut state = self.lock();
            self.insert(&mut state, record);
        }
        self.available.notify_one();
    }

    /// Puts back a record obtained from a pop without processing it
    pub fn requeue(&self, record: UrlRecord) {
        {
            let mut state = self.lock();
            self.insert(&mut state, record);
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        self.available.notify_one();
    }

    /// Pops the best valid record if one is queued
    ///
    /// Tombstoned records found on the way are discarded. A returned record
    /// counts as in flight until [`FrontierQueue::complete`] or
    /// [`FrontierQueue::requeue`] is called for it.
    pub fn try_pop(&self) -> Option<UrlRecord> {
        let mut state = self.lock();
        while let Some(entry) = state.heap.pop() {
            if !entry.record.is_valid() {
                tracing::trace!("Discarding tombstoned entry for {}", entry.record.url());
                continue;
            }
            state.in_flight += 1;
            return Some(entry.record);
        }
        None
    }

    /// Waits up to `timeout` for the best valid record
    ///
    /// # Returns
    ///
    /// * `Some(UrlRecord)` - A valid record, now in flight
    /// * `None` - The wait timed out, or the queue is drained
    pub async fn pop_blocking(&self, timeout: Duration) -> Option<UrlRecord> {
        let deadline = Instant::now() + timeout;

        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            // Register before checking so a push between the check and the
            // wait is not missed
            notified.as_mut().enable();

            if let Some(record) = self.try_pop() {
                return Some(record);
            }
            if self.is_drained() {
                return None;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return None;
            }
        }
    }

    /// Marks one popped record as finished
    pub fn complete(&self) {
        let drained = {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.is_drained()
        };
        if drained {
            self.available.notify_waiters();
        }
    }

    /// Nothing is queued and no popped record is still being worked on
    pub fn is_drained(&self) -> bool {
        self.lock().is_drained()
    }

    /// Number of heap entries, tombstones included
    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().heap.is_empty()
    }

    /// Number of popped records not yet completed or requeued
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    fn insert(&self, state: &mut QueueState, record: UrlRecord) {
        let rank = match self.policy {
            CrawlPolicy::Prioritized => record.priority(),
            CrawlPolicy::BreadthFirst => 0.0,
        };
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(QueueEntry { rank, seq, record });
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(url: &str, novelty: f64) -> UrlRecord {
        let mut record = UrlRecord::new(url, 0).unwrap();
        record.update_novelty(novelty);
        record
    }

    #[test]
    fn test_pops_lowest_priority_first() {
        let queue = FrontierQueue::new(CrawlPolicy::Prioritized);
        queue.push(record("http://a.test/high", 5.0));
        queue.push(record("http://a.test/low", 1.0));
        queue.push(record("http://a.test/mid", 3.0));

        let order: Vec<String> = std::iter::from_fn(|| queue.try_pop())
            .map(|r| r.url().path().to_string())
            .collect();
        assert_eq!(order, vec!["/low", "/mid", "/high"]);
    }

    #[test]
    fn test_breadth_first_is_fifo() {
        let queue = FrontierQueue::new(CrawlPolicy::BreadthFirst);
        queue.push(record("http://a.test/first", 5.0));
        queue.push(record("http://a.test/second", 1.0));
        queue.push(record("http://a.test/third", 3.0));

        let order: Vec<String> = std::iter::from_fn(|| queue.try_pop())
            .map(|r| r.url().path().to_string())
            .collect();
        assert_eq!(order, vec!["/first", "/second", "/third"]);
    }

    #[test]
    fn test_equal_priorities_do_not_panic() {
        let queue = FrontierQueue::new(CrawlPolicy::Prioritized);
        for i in 0..20 {
            queue.push(record(&format!("http://a.test/{}", i), 1.0));
        }
        assert_eq!(std::iter::from_fn(|| queue.try_pop()).count(), 20);
    }

    #[test]
    fn test_tombstoned_record_is_skipped() {
        let queue = FrontierQueue::new(CrawlPolicy::Prioritized);
        let stale = record("http://a.test/x", 0.0);
        queue.push(stale.clone());
        queue.push(record("http://a.test/y", 2.0));

        stale.invalidate();

        let popped = queue.try_pop().unwrap();
        assert_eq!(popped.url().path(), "/y");
        assert!(queue.try_pop().is_none());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_pop_blocking_never_returns_tombstone() {
        let queue = FrontierQueue::new(CrawlPolicy::Prioritized);
        let stale = record("http://a.test/x", 0.0);
        queue.push(stale.clone());
        stale.invalidate();

        // Keep one record in flight so the queue is not drained
        queue.push(record("http://a.test/busy", 9.0));
        let _busy = queue.try_pop();

        let popped = queue.pop_blocking(Duration::from_millis(50)).await;
        assert!(popped.is_none());
    }

    #[tokio::test]
    async fn test_pop_blocking_times_out() {
        let queue = FrontierQueue::new(CrawlPolicy::Prioritized);
        queue.push(record("http://a.test/busy", 0.0));
        let _busy = queue.try_pop();

        let start = Instant::now();
        assert!(queue.pop_blocking(Duration::from_millis(50)).await.is_none());
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_pop_blocking_wakes_on_push() {
        let queue = Arc::new(FrontierQueue::new(CrawlPolicy::Prioritized));
        queue.push(record("http://a.test/busy", 0.0));
        let _busy = queue.try_pop();

        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop_blocking(Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push(record("http://a.test/late", 1.0));

        let popped = waiter.await.unwrap();
        assert_eq!(popped.map(|r| r.url().path().to_string()), Some("/late".to_string()));
    }

    #[tokio::test]
    async fn test_drained_queue_returns_immediately() {
        let queue = FrontierQueue::new(CrawlPolicy::Prioritized);
        let start = Instant::now();
        assert!(queue.pop_blocking(Duration::from_secs(5)).await.is_none());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_complete_releases_waiters_when_drained() {
        let queue = Arc::new(FrontierQueue::new(CrawlPolicy::Prioritized));
        queue.push(record("http://a.test/only", 0.0));
        assert!(queue.try_pop().is_some());

        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move {
                let start = Instant::now();
                let popped = queue.pop_blocking(Duration::from_secs(5)).await;
                (popped.is_none(), start.elapsed())
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.complete();

        let (empty, waited) = waiter.await.unwrap();
        assert!(empty);
        assert!(waited < Duration::from_secs(1));
        assert!(queue.is_drained());
    }

    #[test]
    fn test_in_flight_accounting() {
        let queue = FrontierQueue::new(CrawlPolicy::Prioritized);
        queue.push(record("http://a.test/x", 0.0));
        queue.push(record("http://a.test/y", 1.0));

        let first = queue.try_pop().unwrap();
        let second = queue.try_pop().unwrap();
        assert_eq!(queue.in_flight(), 2);

        queue.requeue(second);
        assert_eq!(queue.in_flight(), 1);
        assert_eq!(queue.len(), 1);

        drop(first);
        queue.complete();
        assert_eq!(queue.in_flight(), 0);
        assert!(!queue.is_drained());
    }
}
