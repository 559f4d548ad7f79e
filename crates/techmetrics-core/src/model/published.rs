//! The consolidated record exposed to downstream consumers

use crate::model::library::LibraryName;
use crate::model::snapshot::{DownloadSnapshot, GithubSnapshot};
use serde::{Deserialize, Serialize};

/// Column order of the published table. Downstream consumers depend on it.
pub const PUBLISHED_COLUMNS: [&str; 19] = [
    "name",
    "github_owner",
    "github_repository_name",
    "pypi_name",
    "language",
    "stars",
    "forks",
    "watchers",
    "open_issues",
    "size_kb",
    "created_at",
    "updated_at",
    "total_contributors",
    "total_commits",
    "total_downloads_alltime",
    "commits_last_year",
    "downloads_last_year",
    "commits_last_month",
    "downloads_last_month",
];

/// One row of the published table
///
/// Field order mirrors `PUBLISHED_COLUMNS`. Registry-sourced fields
/// (`pypi_name` and the `downloads_*` counters) are `None` when the library
/// has no registry snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedRecord {
    pub name: LibraryName,
    pub github_owner: String,
    pub github_repository_name: String,
    pub pypi_name: Option<String>,
    pub language: Option<String>,
    pub stars: i64,
    pub forks: i64,
    pub watchers: i64,
    pub open_issues: i64,
    pub size_kb: i64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub total_contributors: Option<i64>,
    pub total_commits: Option<i64>,
    pub total_downloads_alltime: Option<i64>,
    pub commits_last_year: Option<i64>,
    pub downloads_last_year: Option<i64>,
    pub commits_last_month: Option<i64>,
    pub downloads_last_month: Option<i64>,
}

impl PublishedRecord {
    /// Combine a GitHub-side snapshot with its registry match, if any
    pub fn from_parts(github: &GithubSnapshot, downloads: Option<&DownloadSnapshot>) -> Self {
        Self {
            name: github.name.clone(),
            github_owner: github.github_owner.clone(),
            github_repository_name: github.github_repository_name.clone(),
            pypi_name: downloads.map(|d| d.pypi_name.clone()),
            language: github.language.clone(),
            stars: github.stars,
            forks: github.forks,
            watchers: github.watchers,
            open_issues: github.open_issues,
            size_kb: github.size_kb,
            created_at: github.created_at.clone(),
            updated_at: github.updated_at.clone(),
            total_contributors: github.total_contributors,
            total_commits: github.total_commits,
            total_downloads_alltime: downloads.map(|d| d.total_downloads_alltime),
            commits_last_year: github.commits_last_year,
            downloads_last_year: downloads.map(|d| d.downloads_last_year),
            commits_last_month: github.commits_last_month,
            downloads_last_month: downloads.map(|d| d.downloads_last_month),
        }
    }

    /// Whether any registry-sourced field is populated
    pub fn has_download_stats(&self) -> bool {
        self.pypi_name.is_some()
    }
}
