//! Crawl frontier: URL records, prefix tries, scoring and the shared queue
//!
//! # Components
//!
//! - `UrlRecord`: a discovered URL with its scores and crawl outcome
//! - `PrefixTrie`: per-segment counts of recorded URL paths (frontier and explored)
//! - `scoring`: novelty, importance and the tombstone-replace merge
//! - `FrontierQueue`: the concurrent min-priority queue workers pop from

mod queue;
mod record;
pub mod scoring;
mod trie;

pub use queue::FrontierQueue;
pub use record::{UrlRecord, IMPORTANCE_DAMPING};
pub use trie::{NodeId, PathStep, PrefixTrie, Slot};
