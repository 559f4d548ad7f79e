//! Left outer join of the two latest-snapshot sets
//!
//! The GitHub side drives: every library it knows yields exactly one record,
//! with registry fields left empty when there is no match. Libraries known
//! only to the registry are dropped.

use crate::model::{DownloadSnapshot, GithubSnapshot, LibraryName, PublishedRecord};
use crate::resolver::LatestSet;

/// Output of a join: the records to publish and the registry-only libraries left out
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Consolidation {
    /// Ascending by library name
    pub records: Vec<PublishedRecord>,
    /// Registry-side libraries with no GitHub-side snapshot, ascending
    pub dropped: Vec<LibraryName>,
}

impl Consolidation {
    /// Records that found a registry match
    pub fn matched_count(&self) -> usize {
        self.records.iter().filter(|r| r.has_download_stats()).count()
    }
}

/// Join the latest GitHub-side rows with the latest registry-side rows on library name
pub fn consolidate(
    github: &LatestSet<GithubSnapshot>,
    downloads: &LatestSet<DownloadSnapshot>,
) -> Consolidation {
    let records: Vec<PublishedRecord> = github
        .iter()
        .map(|(name, row)| {
            PublishedRecord::from_parts(&row.snapshot, downloads.get(name).map(|d| &d.snapshot))
        })
        .collect();

    let dropped: Vec<LibraryName> = downloads
        .keys()
        .filter(|name| !github.contains_key(*name))
        .cloned()
        .collect();

    if !dropped.is_empty() {
        tracing::debug!(
            dropped = dropped.len(),
            libraries = ?dropped.iter().map(LibraryName::as_str).collect::<Vec<_>>(),
            "Registry-only libraries left out of published set"
        );
    }

    Consolidation { records, dropped }
}
