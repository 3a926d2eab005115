//! Novelty and importance scoring, and the tombstone-replace merge
//!
//! Sign convention: novelty is the explored-trie count along a URL's path, so
//! a *higher* novelty means the prefix is already well covered. Priority is
//! `novelty - 0.001 * importance` and the lowest priority is crawled first.

use crate::frontier::record::UrlRecord;
use crate::frontier::trie::{PathStep, PrefixTrie, Slot};

/// Weight of a link from a page on the same domain
pub const SAME_DOMAIN_WEIGHT: u64 = 1;

/// Weight of a link from a page on another domain
pub const CROSS_DOMAIN_WEIGHT: u64 = 2;

/// Explored-trie aggregate along the record's path
pub fn novelty(record: &UrlRecord, explored: &PrefixTrie) -> f64 {
    explored.aggregate_count(record.trie_path().as_slice()) as f64
}

/// Weight a discovery adds to every frontier node on the record's path
///
/// Seeds have no discovering page and count as same-domain links.
pub fn base_weight(record: &UrlRecord, discoverer: Option<&UrlRecord>) -> u64 {
    match discoverer {
        Some(page) if page.domain() != record.domain() => CROSS_DOMAIN_WEIGHT,
        _ => SAME_DOMAIN_WEIGHT,
    }
}

/// Records one discovery of `record` in the frontier trie and returns its
/// importance together with the visited nodes
///
/// Importance is the sum of the node counts observed while they are being
/// incremented: a node created by this walk contributes the base weight, a
/// node seen before contributes its new count.
pub fn importance(
    frontier: &mut PrefixTrie,
    record: &UrlRecord,
    discoverer: Option<&UrlRecord>,
) -> (f64, Vec<PathStep>) {
    let weight = base_weight(record, discoverer);
    let steps = frontier.record_steps(record.trie_path().as_slice(), weight);
    let total: u64 = steps.iter().map(|step| step.count).sum();
    (total as f64, steps)
}

/// Merges a newly discovered record into the frontier trie
///
/// Must run under the frontier trie's guard for the whole call. Walking the
/// record's path adds its weight to every prefix. Every record pending on a
/// node of the path, the record's own node included, is tombstoned and
/// replaced by a copy whose importance is the running sum at that depth. For
/// the record's own URL:
///
/// * never queued: the record itself, scored, becomes the current record
/// * pending: the existing record is superseded as above
/// * claimed: the URL is already taken, nothing is queued
///
/// # Returns
///
/// The records to push onto the frontier queue, in path order.
pub fn merge_into_frontier(
    frontier: &mut PrefixTrie,
    record: UrlRecord,
    discoverer: Option<&UrlRecord>,
) -> Vec<UrlRecord> {
    let (_, steps) = importance(frontier, &record, discoverer);
    let Some(terminal) = steps.last().map(|step| step.node) else {
        return Vec::new();
    };
    let unseen = frontier.slot(terminal, record.url().as_str()).is_none();

    let mut updated = Vec::new();
    let mut running: u64 = 0;

    for step in &steps {
        running += step.count;

        for existing in frontier.pending_at(step.node) {
            existing.invalidate();
            let mut copy = existing.superseding_copy();
            copy.update_importance(running as f64);
            frontier.set_slot(step.node, copy.url().as_str(), Slot::Pending(copy.clone()));
            updated.push(copy);
        }
    }

    if unseen {
        let mut record = record;
        record.update_importance(running as f64);
        frontier.set_slot(terminal, record.url().as_str(), Slot::Pending(record.clone()));
        updated.push(record);
    }

    updated
}
