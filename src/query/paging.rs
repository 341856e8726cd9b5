//! Anchor-based paging over a merged scan result.
//!
//! The merged result is stable-sorted with the query's comparator, the scan resumes right
//! after the nearest recorded anchor, any whole pages between that anchor and the requested
//! page are skipped, and at most one page is returned.

use super::types::{Anchor, EntryComparator, PagingSpec, QueryEntry};
use std::cmp::Ordering;

pub fn sorted_page(mut entries: Vec<QueryEntry>, paging: &PagingSpec) -> Vec<QueryEntry> {
    let comparator = paging.comparator();
    // `sort_by` is stable: equal entries keep their merge order.
    entries.sort_by(|a, b| comparator.compare(a, b));

    let page_size = paging.page_size();
    let (start, pages_to_skip) = match paging.nearest_anchor() {
        Some(anchor) => (
            position_after(&entries, anchor, comparator),
            paging.page() - anchor.page - 1,
        ),
        None => (0, paging.page()),
    };

    let begin = start.saturating_add(pages_to_skip.saturating_mul(page_size));
    if begin >= entries.len() {
        return Vec::new();
    }
    let end = begin.saturating_add(page_size).min(entries.len());

    tracing::trace!(
        "Paging: page {} covers [{}, {}) of {} sorted entries",
        paging.page(),
        begin,
        end,
        entries.len()
    );

    entries.drain(begin..end).collect()
}

/// Index of the first entry that comes after `anchor` in sorted order.
///
/// Positions by comparing against the anchored entry as it was recorded, so a later change to
/// that key's value does not move the page boundary. Within the run of entries comparing
/// equal to the anchor, the anchored key (if still there) marks where the previous page ended.
fn position_after(entries: &[QueryEntry], anchor: &Anchor, comparator: &EntryComparator) -> usize {
    let start = entries.partition_point(|e| comparator.compare(e, &anchor.entry) == Ordering::Less);
    let end =
        entries.partition_point(|e| comparator.compare(e, &anchor.entry) != Ordering::Greater);
    match entries[start..end]
        .iter()
        .position(|e| e.key == anchor.entry.key)
    {
        Some(offset) => start + offset + 1,
        None => end,
    }
}
