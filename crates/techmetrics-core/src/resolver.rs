//! Latest-snapshot resolution
//!
//! Reduces an append-only snapshot history to exactly one row per library.
//! Rows are compared on `(recency_key, row_id)`: the highest recency key
//! wins, and among rows tying on it the most recently inserted row (highest
//! `row_id`) wins. The result does not depend on the order rows are supplied.

use crate::model::{DownloadSnapshot, GithubSnapshot, LibraryName, Recency, SnapshotRow};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Latest snapshot per library, iterated in ascending library order
pub type LatestSet<T> = BTreeMap<LibraryName, SnapshotRow<T>>;

/// Select the newest row per library from a snapshot history
pub fn resolve_latest<T, I>(history: I) -> LatestSet<T>
where
    T: Recency,
    I: IntoIterator<Item = SnapshotRow<T>>,
{
    let mut latest: LatestSet<T> = BTreeMap::new();

    for row in history {
        match latest.entry(row.snapshot.library().clone()) {
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
            Entry::Occupied(mut slot) => {
                if supersedes(&row, slot.get()) {
                    slot.insert(row);
                }
            }
        }
    }

    latest
}

fn supersedes<T: Recency>(candidate: &SnapshotRow<T>, current: &SnapshotRow<T>) -> bool {
    (candidate.snapshot.recency_key(), candidate.row_id)
        > (current.snapshot.recency_key(), current.row_id)
}

/// Latest GitHub-side snapshot per library, by `collected_at`
pub fn resolve_latest_github<I>(history: I) -> LatestSet<GithubSnapshot>
where
    I: IntoIterator<Item = SnapshotRow<GithubSnapshot>>,
{
    let latest = resolve_latest(history);
    tracing::debug!(source = "github", resolved_len = latest.len(), "Resolved latest snapshots");
    latest
}

/// Latest registry-side snapshot per library, by `downloads_last_year`
pub fn resolve_latest_downloads<I>(history: I) -> LatestSet<DownloadSnapshot>
where
    I: IntoIterator<Item = SnapshotRow<DownloadSnapshot>>,
{
    let latest = resolve_latest(history);
    tracing::debug!(source = "pypi", resolved_len = latest.len(), "Resolved latest snapshots");
    latest
}
