//! Per-source snapshot records
//!
//! Snapshots are immutable point-in-time pulls. The store assigns each one a
//! `row_id` in insertion order; that id only matters for breaking recency ties.

use crate::errors::MetricsError;
use crate::model::library::LibraryName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One pull of repository metrics from the code-hosting platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubSnapshot {
    pub name: LibraryName,
    pub github_owner: String,
    pub github_repository_name: String,
    pub stars: i64,
    pub forks: i64,
    pub watchers: i64,
    pub open_issues: i64,
    #[serde(default)]
    pub language: Option<String>,
    pub size_kb: i64,
    /// Repository creation time as reported by the source
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last repository update as reported by the source
    #[serde(default)]
    pub updated_at: Option<String>,
    /// When this snapshot was taken
    pub collected_at: DateTime<Utc>,
    // Contributor and commit statistics are None when the upstream call failed
    #[serde(default)]
    pub total_contributors: Option<i64>,
    #[serde(default)]
    pub total_commits: Option<i64>,
    #[serde(default)]
    pub commits_last_year: Option<i64>,
    #[serde(default)]
    pub commits_last_month: Option<i64>,
}

impl GithubSnapshot {
    /// Reject negative counters before they reach the store
    ///
    /// # Errors
    ///
    /// `MetricsError::NegativeCounter` naming the first offending field.
    pub fn validate(&self) -> Result<(), MetricsError> {
        let required = [
            ("stars", self.stars),
            ("forks", self.forks),
            ("watchers", self.watchers),
            ("open_issues", self.open_issues),
            ("size_kb", self.size_kb),
        ];
        let optional = [
            ("total_contributors", self.total_contributors),
            ("total_commits", self.total_commits),
            ("commits_last_year", self.commits_last_year),
            ("commits_last_month", self.commits_last_month),
        ];
        let counters = required
            .into_iter()
            .chain(optional.into_iter().filter_map(|(f, v)| v.map(|v| (f, v))));
        check_non_negative(&self.name, counters)
    }
}

/// One extraction run of download statistics from the package registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadSnapshot {
    pub name: LibraryName,
    pub pypi_name: String,
    pub total_downloads_alltime: i64,
    /// Downloads in the trailing four weeks
    pub downloads_last_month: i64,
    pub downloads_last_year: i64,
}

impl DownloadSnapshot {
    /// Reject negative download counts before they reach the store
    ///
    /// # Errors
    ///
    /// `MetricsError::NegativeCounter` naming the first offending field.
    pub fn validate(&self) -> Result<(), MetricsError> {
        check_non_negative(
            &self.name,
            [
                ("total_downloads_alltime", self.total_downloads_alltime),
                ("downloads_last_month", self.downloads_last_month),
                ("downloads_last_year", self.downloads_last_year),
            ],
        )
    }
}

fn check_non_negative(
    library: &LibraryName,
    counters: impl IntoIterator<Item = (&'static str, i64)>,
) -> Result<(), MetricsError> {
    for (field, value) in counters {
        if value < 0 {
            return Err(MetricsError::NegativeCounter {
                library: library.to_string(),
                field,
                value,
            });
        }
    }
    Ok(())
}

/// A snapshot as read back from the store, with its insertion-order id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRow<T> {
    pub row_id: i64,
    pub snapshot: T,
}

impl<T> SnapshotRow<T> {
    pub fn new(row_id: i64, snapshot: T) -> Self {
        Self { row_id, snapshot }
    }
}

/// How a source orders its snapshots of one library from oldest to newest
pub trait Recency {
    type Key: Ord;

    fn library(&self) -> &LibraryName;

    fn recency_key(&self) -> Self::Key;
}

impl Recency for GithubSnapshot {
    type Key = DateTime<Utc>;

    fn library(&self) -> &LibraryName {
        &self.name
    }

    fn recency_key(&self) -> Self::Key {
        self.collected_at
    }
}

impl Recency for DownloadSnapshot {
    type Key = i64;

    fn library(&self) -> &LibraryName {
        &self.name
    }

    /// The registry extract has no collection timestamp, so the trailing-year
    /// download count stands in for recency. A newer extract with fewer
    /// downloads loses to an older, larger one.
    fn recency_key(&self) -> Self::Key {
        self.downloads_last_year
    }
}
