//! Prefix trie keyed by URL path segments
//!
//! The path of a URL in the trie is `[domain, segment-1, ..., segment-k, query?]`
//! (see [`UrlRecord::trie_path`]). Every node counts how often a recorded
//! path passed through it. Nodes live in an arena and are never removed.
//!
//! Frontier state is kept per normalized URL at the node its path ends on. A
//! path is not a URL identity: `http://a.test/x` and `https://a.test/x` end
//! on the same node and each have their own slot there.

use crate::frontier::record::UrlRecord;
use std::collections::{BTreeMap, HashMap};

/// Index of a node in the trie arena
pub type NodeId = usize;

const ROOT: NodeId = 0;

/// What the frontier knows about a URL ending at a node
///
/// A URL without a slot has never been queued.
#[derive(Debug, Clone)]
pub enum Slot {
    /// The record currently queued for this URL
    Pending(UrlRecord),
    /// A worker has taken this URL; later discoveries only add counts
    Claimed,
}

#[derive(Debug, Default)]
struct TrieNode {
    count: u64,
    slots: BTreeMap<String, Slot>,
    children: HashMap<String, NodeId>,
}

/// A node visited by [`PrefixTrie::record_path`] together with its count
/// after the increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStep {
    pub node: NodeId,
    pub count: u64,
}

/// Arena-backed trie of URL path prefixes
#[derive(Debug)]
pub struct PrefixTrie {
    nodes: Vec<TrieNode>,
}

impl Default for PrefixTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefixTrie {
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
        }
    }

    /// Number of nodes, excluding the root
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Walks `segments`, creating missing nodes and adding `weight` to every
    /// node on the way
    ///
    /// # Returns
    ///
    /// The count observed at each depth after the increment. A node created by
    /// this call reports exactly `weight`.
    pub fn record_path<S: AsRef<str>>(&mut self, segments: &[S], weight: u64) -> Vec<u64> {
        self.record_steps(segments, weight)
            .into_iter()
            .map(|step| step.count)
            .collect()
    }

    /// Same walk as [`PrefixTrie::record_path`], also returning node ids so the
    /// caller can inspect each node's slot without a second traversal
    pub fn record_steps<S: AsRef<str>>(&mut self, segments: &[S], weight: u64) -> Vec<PathStep> {
        let mut steps = Vec::with_capacity(segments.len());
        let mut current = ROOT;

        for segment in segments {
            let segment = segment.as_ref();
            let next = match self.nodes[current].children.get(segment) {
                Some(&id) => id,
                None => {
                    let id = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[current].children.insert(segment.to_string(), id);
                    id
                }
            };

            let node = &mut self.nodes[next];
            node.count += weight;
            steps.push(PathStep {
                node: next,
                count: node.count,
            });
            current = next;
        }

        steps
    }

    /// Sum of counts along `segments`
    ///
    /// Stops at the first missing segment and returns the partial sum, so a URL
    /// sharing only its domain with recorded paths still picks up the domain's
    /// count.
    pub fn aggregate_count<S: AsRef<str>>(&self, segments: &[S]) -> u64 {
        let mut total = 0;
        let mut current = ROOT;

        for segment in segments {
            match self.nodes[current].children.get(segment.as_ref()) {
                Some(&id) => {
                    total += self.nodes[id].count;
                    current = id;
                }
                None => break,
            }
        }

        total
    }

    /// True if every segment of the chain exists as a node
    pub fn path_exists<S: AsRef<str>>(&self, segments: &[S]) -> bool {
        self.find(segments).is_some()
    }

    /// Count at the node for `segments`, if it exists
    pub fn count_at<S: AsRef<str>>(&self, segments: &[S]) -> Option<u64> {
        self.find(segments).map(|id| self.nodes[id].count)
    }

    /// A record currently queued for exactly this path
    ///
    /// When several URLs share the path (`http` and `https` forms), the first
    /// pending one in URL order is returned.
    pub fn current_record_at<S: AsRef<str>>(&self, segments: &[S]) -> Option<&UrlRecord> {
        let id = self.find(segments)?;
        self.nodes[id].slots.values().find_map(|slot| match slot {
            Slot::Pending(record) => Some(record),
            Slot::Claimed => None,
        })
    }

    /// The record currently queued for the record's own URL
    pub fn current_record_for(&self, record: &UrlRecord) -> Option<&UrlRecord> {
        let id = self.find(record.trie_path().as_slice())?;
        match self.nodes[id].slots.get(record.url().as_str()) {
            Some(Slot::Pending(current)) => Some(current),
            _ => None,
        }
    }

    /// Stores `record` as the queued record for its URL
    ///
    /// # Returns
    ///
    /// `false` if the record's path does not exist; nothing is created in that
    /// case.
    pub fn set_record_for(&mut self, record: UrlRecord) -> bool {
        let node = self.find(record.trie_path().as_slice());
        match node {
            Some(id) => {
                let key = record.url().to_string();
                self.nodes[id].slots.insert(key, Slot::Pending(record));
                true
            }
            None => false,
        }
    }

    /// Marks the record's URL as taken by a worker
    ///
    /// # Returns
    ///
    /// The record that was pending for the URL, if any.
    pub fn claim(&mut self, record: &UrlRecord) -> Option<UrlRecord> {
        let id = self.find(record.trie_path().as_slice())?;
        match self.nodes[id]
            .slots
            .insert(record.url().to_string(), Slot::Claimed)
        {
            Some(Slot::Pending(previous)) => Some(previous),
            _ => None,
        }
    }

    /// Slot of `url` at `node`; `None` if the URL was never queued there
    pub fn slot(&self, node: NodeId, url: &str) -> Option<&Slot> {
        self.nodes[node].slots.get(url)
    }

    pub fn set_slot(&mut self, node: NodeId, url: &str, slot: Slot) {
        self.nodes[node].slots.insert(url.to_string(), slot);
    }

    /// Records pending at `node`, in URL order
    pub fn pending_at(&self, node: NodeId) -> Vec<UrlRecord> {
        self.nodes[node]
            .slots
            .values()
            .filter_map(|slot| match slot {
                Slot::Pending(record) => Some(record.clone()),
                Slot::Claimed => None,
            })
            .collect()
    }

    fn find<S: AsRef<str>>(&self, segments: &[S]) -> Option<NodeId> {
        if segments.is_empty() {
            return None;
        }

        let mut current = ROOT;
        for segment in segments {
            current = *self.nodes[current].children.get(segment.as_ref())?;
        }
        Some(current)
    }
}
