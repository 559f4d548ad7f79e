//! Snapshot Store
//!
//! Append-only history for both sources. Writes are batched: one transaction
//! and one prepared statement per call, so a batch lands completely or not at
//! all. Rows are never updated or deleted (the schema enforces it with
//! triggers).

use crate::errors::{sqlite_op, Result};
use chrono::{TimeZone, Utc};
use rusqlite::{Connection, Row};
use techmetrics_core::errors::{ExError, ExErrorKind};
use techmetrics_core::model::{DownloadSnapshot, GithubSnapshot, LibraryName, SnapshotRow};

/// SQLite repository for the two snapshot histories
pub struct SnapshotRepo;

impl SnapshotRepo {
    /// Append a batch of GitHub-side snapshots
    ///
    /// Returns the number of rows written.
    pub fn append_github(conn: &mut Connection, batch: &[GithubSnapshot]) -> Result<usize> {
        let tx = conn.transaction().map_err(sqlite_op("append_github"))?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO github_repo_metrics (
                        name, github_owner, github_repository_name, stars, forks, watchers,
                        open_issues, language, size_kb, created_at, updated_at, collected_at,
                        total_contributors, total_commits, commits_last_year, commits_last_month
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                )
                .map_err(sqlite_op("append_github"))?;

            for snap in batch {
                stmt.execute(rusqlite::params![
                    snap.name.as_str(),
                    snap.github_owner,
                    snap.github_repository_name,
                    snap.stars,
                    snap.forks,
                    snap.watchers,
                    snap.open_issues,
                    snap.language,
                    snap.size_kb,
                    snap.created_at,
                    snap.updated_at,
                    snap.collected_at.timestamp_micros(),
                    snap.total_contributors,
                    snap.total_commits,
                    snap.commits_last_year,
                    snap.commits_last_month,
                ])
                .map_err(|e| sqlite_op("append_github")(e).with_entity_id(snap.name.as_str()))?;
            }
        }
        tx.commit().map_err(sqlite_op("append_github"))?;

        tracing::debug!(source = "github", rows = batch.len(), "Appended snapshot batch");
        Ok(batch.len())
    }

    /// Append a batch of registry-side snapshots
    ///
    /// Returns the number of rows written.
    pub fn append_downloads(conn: &mut Connection, batch: &[DownloadSnapshot]) -> Result<usize> {
        let tx = conn.transaction().map_err(sqlite_op("append_downloads"))?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO pypi_download_stats (
                        name, pypi_name, total_downloads_alltime,
                        downloads_last_month, downloads_last_year
                    ) VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(sqlite_op("append_downloads"))?;

            for snap in batch {
                stmt.execute(rusqlite::params![
                    snap.name.as_str(),
                    snap.pypi_name,
                    snap.total_downloads_alltime,
                    snap.downloads_last_month,
                    snap.downloads_last_year,
                ])
                .map_err(|e| sqlite_op("append_downloads")(e).with_entity_id(snap.name.as_str()))?;
            }
        }
        tx.commit().map_err(sqlite_op("append_downloads"))?;

        tracing::debug!(source = "pypi", rows = batch.len(), "Appended snapshot batch");
        Ok(batch.len())
    }

    /// Full GitHub-side history in insertion order
    pub fn load_github_history(conn: &Connection) -> Result<Vec<SnapshotRow<GithubSnapshot>>> {
        let mut stmt = conn
            .prepare(
                "SELECT row_id, name, github_owner, github_repository_name, stars, forks,
                        watchers, open_issues, language, size_kb, created_at, updated_at,
                        collected_at, total_contributors, total_commits,
                        commits_last_year, commits_last_month
                 FROM github_repo_metrics
                 ORDER BY row_id",
            )
            .map_err(read_error("load_github_history"))?;

        let rows = stmt
            .query_map([], github_from_row)
            .map_err(read_error("load_github_history"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(read_error("load_github_history"))?;

        Ok(rows)
    }

    /// Full registry-side history in insertion order
    pub fn load_download_history(conn: &Connection) -> Result<Vec<SnapshotRow<DownloadSnapshot>>> {
        let mut stmt = conn
            .prepare(
                "SELECT row_id, name, pypi_name, total_downloads_alltime,
                        downloads_last_month, downloads_last_year
                 FROM pypi_download_stats
                 ORDER BY row_id",
            )
            .map_err(read_error("load_download_history"))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(SnapshotRow::new(
                    row.get(0)?,
                    DownloadSnapshot {
                        name: library_name(row, 1)?,
                        pypi_name: row.get(2)?,
                        total_downloads_alltime: row.get(3)?,
                        downloads_last_month: row.get(4)?,
                        downloads_last_year: row.get(5)?,
                    },
                ))
            })
            .map_err(read_error("load_download_history"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(read_error("load_download_history"))?;

        Ok(rows)
    }
}

fn github_from_row(row: &Row<'_>) -> rusqlite::Result<SnapshotRow<GithubSnapshot>> {
    // Microseconds, the finest precision the extractors report
    let collected_us: i64 = row.get(12)?;
    let collected_at = Utc
        .timestamp_micros(collected_us)
        .single()
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(12, collected_us))?;

    Ok(SnapshotRow::new(
        row.get(0)?,
        GithubSnapshot {
            name: library_name(row, 1)?,
            github_owner: row.get(2)?,
            github_repository_name: row.get(3)?,
            stars: row.get(4)?,
            forks: row.get(5)?,
            watchers: row.get(6)?,
            open_issues: row.get(7)?,
            language: row.get(8)?,
            size_kb: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
            collected_at,
            total_contributors: row.get(13)?,
            total_commits: row.get(14)?,
            commits_last_year: row.get(15)?,
            commits_last_month: row.get(16)?,
        },
    ))
}

pub(crate) fn library_name(row: &Row<'_>, idx: usize) -> rusqlite::Result<LibraryName> {
    let raw: String = row.get(idx)?;
    LibraryName::new(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Any failure reading history is a read failure, whatever SQLite reported
fn read_error(op: &'static str) -> impl Fn(rusqlite::Error) -> ExError {
    move |err| {
        ExError::new(ExErrorKind::Persistence)
            .with_op(op)
            .with_message(format!("Failed to read snapshot history: {}", err))
    }
}
