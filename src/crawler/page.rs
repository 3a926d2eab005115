//! Processing of a single dequeued page
//!
//! Robots check, fetch, link extraction and href vetting. The outcome is
//! written back onto the record; the discovered links come back as unscored
//! child records one hop deeper.

use crate::crawler::collaborators::{PageFetcher, RobotsPolicy};
use crate::frontier::UrlRecord;
use crate::url::vet_href;

/// Processes `record` and returns the records for the links it contains
///
/// On return the record carries the robots-denied flag, or the response code,
/// size and fetch time when the fetch succeeded. A denied or failed page
/// yields no children, and neither does a page at `max_depth`.
///
/// # Arguments
///
/// * `record` - The page to process
/// * `robots` - Robots exclusion predicate
/// * `fetcher` - Page download and link extraction
/// * `max_depth` - Children deeper than this are not built
pub async fn process(
    record: &mut UrlRecord,
    robots: &dyn RobotsPolicy,
    fetcher: &dyn PageFetcher,
    max_depth: Option<u32>,
) -> Vec<UrlRecord> {
    if !robots.can_fetch(record.base_url(), record.url()).await {
        record.denied_by_robot_exclusion = true;
        return Vec::new();
    }

    let Some(page) = fetcher.fetch_and_extract(record.url()).await else {
        return Vec::new();
    };
    record.response_code = Some(page.response_code);
    record.size = Some(page.size);
    record.fetched_at = Some(page.fetched_at);

    let child_depth = record.depth + 1;
    if max_depth.is_some_and(|limit| child_depth > limit) {
        tracing::trace!("Not following links of {} past depth {}", record.url(), record.depth);
        return Vec::new();
    }

    build_children(record, &page.hrefs, child_depth)
}

/// Vets hrefs found on `page` and turns the survivors into records
///
/// Hrefs that pass vetting but still do not form a valid URL are dropped.
pub fn build_children(page: &UrlRecord, hrefs: &[String], depth: u32) -> Vec<UrlRecord> {
    hrefs
        .iter()
        .filter_map(|href| vet_href(page.base_url(), href))
        .filter_map(|link| match UrlRecord::new(&link, depth) {
            Ok(child) => Some(child),
            Err(e) => {
                tracing::debug!("Dropping link {} found on {}: {}", link, page.url(), e);
                None
            }
        })
        .collect()
}
