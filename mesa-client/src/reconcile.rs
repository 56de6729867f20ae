//! Snapshot merge algorithm
//!
//! The single merge used everywhere a remote ticket snapshot meets local
//! state (realtime channel, patch responses). Centralized here so it is
//! unit-testable without a live socket.

use std::collections::HashSet;

use shared::LineItem;

/// Merge a remote item list with the local one.
///
/// The remote list is authoritative for every key it contains, including
/// removals it has already applied. Local lines whose key the remote does
/// not know about are appended in local order: a just-tapped item must not
/// be dropped because another session's snapshot arrived first.
///
/// Accepted edge case: if a remote deletion and a local add race on the
/// exact same key, the deleted line is resurrected. Idempotent — merging
/// the same remote snapshot twice yields the same result.
pub fn merge_items(remote: &[LineItem], local: &[LineItem]) -> Vec<LineItem> {
    let known: HashSet<(i64, &str)> = remote.iter().map(|i| i.key()).collect();

    let mut merged = remote.to_vec();
    merged.extend(
        local
            .iter()
            .filter(|i| !known.contains(&i.key()))
            .cloned(),
    );
    merged
}
