//! Publisher: atomic replacement of the published table.
//!
//! ## Protocol
//!
//! 1. `BEGIN IMMEDIATE` (takes the write lock up front)
//! 2. `DELETE FROM tech_metrics`
//! 3. Insert every record through one prepared statement, consulting the
//!    `PublishHook` before each row
//! 4. `COMMIT`
//!
//! SQLite deletes are transactional, so any failure in steps 2-4 rolls the
//! table back to its previous contents. Readers on other connections keep
//! seeing the last committed table until the commit lands (WAL mode).

use crate::errors::{from_rusqlite, Result};
use crate::snapshots::library_name;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use sha2::{Digest, Sha256};
use techmetrics_core::errors::{ExError, ExErrorKind};
use techmetrics_core::model::PublishedRecord;

/// Publisher progress; the state at failure is reported in the error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    Idle,
    TransactionOpen,
    RowsCleared,
    RowsInserted,
    Committed,
    RolledBack,
}

impl PublishState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishState::Idle => "idle",
            PublishState::TransactionOpen => "transaction_open",
            PublishState::RowsCleared => "rows_cleared",
            PublishState::RowsInserted => "rows_inserted",
            PublishState::Committed => "committed",
            PublishState::RolledBack => "rolled_back",
        }
    }
}

/// Hook consulted before each row insert.
///
/// Production uses `NoopPublishHook`. An error returned here aborts the
/// publish exactly like a storage failure would.
pub trait PublishHook {
    fn before_insert(&self, index: usize, record: &PublishedRecord) -> Result<()>;
}

/// Hook that never interferes
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublishHook;

impl PublishHook for NoopPublishHook {
    fn before_insert(&self, _index: usize, _record: &PublishedRecord) -> Result<()> {
        Ok(())
    }
}

/// Outcome of a successful publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub rows_published: usize,
    /// Rows of the previous table that were replaced
    pub rows_replaced: usize,
}

/// Replace the published table with `records`, all or nothing.
///
/// ## Errors
///
/// - `ExErrorKind::PublishFailed`: any failure once the transaction is open;
///   the previous table is intact and the underlying error is the source
/// - `ExErrorKind::Concurrency` / `Persistence`: the transaction could not be
///   opened; nothing was touched
pub fn publish(
    conn: &mut Connection,
    records: &[PublishedRecord],
    hook: &dyn PublishHook,
) -> Result<PublishReport> {
    let mut state = PublishState::Idle;

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| from_rusqlite(e).with_op("publish_begin"))?;
    advance(&mut state, PublishState::TransactionOpen);

    match replace_contents(&tx, records, hook, &mut state) {
        Ok(rows_replaced) => {
            if let Err(e) = tx.commit() {
                // A failed commit leaves the transaction to be rolled back on drop
                advance(&mut state, PublishState::RolledBack);
                return Err(publish_failed(PublishState::RowsInserted, from_rusqlite(e)));
            }
            advance(&mut state, PublishState::Committed);

            tracing::info!(
                rows_published = records.len(),
                rows_replaced,
                "Published consolidated table"
            );
            Ok(PublishReport {
                rows_published: records.len(),
                rows_replaced,
            })
        }
        Err(cause) => {
            let failed_in = state;
            if let Err(rollback_err) = tx.rollback() {
                tracing::warn!(error = %rollback_err, "Explicit rollback failed; relying on drop");
            }
            advance(&mut state, PublishState::RolledBack);
            Err(publish_failed(failed_in, cause))
        }
    }
}

fn replace_contents(
    tx: &Transaction<'_>,
    records: &[PublishedRecord],
    hook: &dyn PublishHook,
    state: &mut PublishState,
) -> Result<usize> {
    let rows_replaced = tx
        .execute("DELETE FROM tech_metrics", [])
        .map_err(|e| from_rusqlite(e).with_op("publish_clear"))?;
    advance(state, PublishState::RowsCleared);

    let mut stmt = tx
        .prepare(
            "INSERT INTO tech_metrics (
                name, github_owner, github_repository_name, pypi_name, language,
                stars, forks, watchers, open_issues, size_kb,
                created_at, updated_at, total_contributors, total_commits,
                total_downloads_alltime, commits_last_year, downloads_last_year,
                commits_last_month, downloads_last_month
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                      ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        )
        .map_err(|e| from_rusqlite(e).with_op("publish_insert"))?;

    for (index, r) in records.iter().enumerate() {
        hook.before_insert(index, r)
            .map_err(|e| e.with_entity_id(r.name.as_str()))?;

        stmt.execute(rusqlite::params![
            r.name.as_str(),
            r.github_owner,
            r.github_repository_name,
            r.pypi_name,
            r.language,
            r.stars,
            r.forks,
            r.watchers,
            r.open_issues,
            r.size_kb,
            r.created_at,
            r.updated_at,
            r.total_contributors,
            r.total_commits,
            r.total_downloads_alltime,
            r.commits_last_year,
            r.downloads_last_year,
            r.commits_last_month,
            r.downloads_last_month,
        ])
        .map_err(|e| {
            from_rusqlite(e)
                .with_op("publish_insert")
                .with_entity_id(r.name.as_str())
        })?;
    }
    advance(state, PublishState::RowsInserted);

    Ok(rows_replaced)
}

fn advance(state: &mut PublishState, next: PublishState) {
    tracing::debug!(from = state.as_str(), to = next.as_str(), "Publish state transition");
    *state = next;
}

fn publish_failed(failed_in: PublishState, cause: ExError) -> ExError {
    let mut err = ExError::new(ExErrorKind::PublishFailed)
        .with_op("publish")
        .with_message(format!(
            "Publish failed in state {}; previous table restored",
            failed_in.as_str()
        ));
    if let Some(library) = cause.entity_id() {
        err = err.with_entity_id(library.to_string());
    }
    err.with_source(cause)
}

/// Current contents of the published table, ascending by name
pub fn load_published(conn: &Connection) -> Result<Vec<PublishedRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT name, github_owner, github_repository_name, pypi_name, language,
                    stars, forks, watchers, open_issues, size_kb,
                    created_at, updated_at, total_contributors, total_commits,
                    total_downloads_alltime, commits_last_year, downloads_last_year,
                    commits_last_month, downloads_last_month
             FROM tech_metrics
             ORDER BY name",
        )
        .map_err(|e| from_rusqlite(e).with_op("load_published"))?;

    let rows = stmt
        .query_map([], |row| {
            Ok(PublishedRecord {
                name: library_name(row, 0)?,
                github_owner: row.get(1)?,
                github_repository_name: row.get(2)?,
                pypi_name: row.get(3)?,
                language: row.get(4)?,
                stars: row.get(5)?,
                forks: row.get(6)?,
                watchers: row.get(7)?,
                open_issues: row.get(8)?,
                size_kb: row.get(9)?,
                created_at: row.get(10)?,
                updated_at: row.get(11)?,
                total_contributors: row.get(12)?,
                total_commits: row.get(13)?,
                total_downloads_alltime: row.get(14)?,
                commits_last_year: row.get(15)?,
                downloads_last_year: row.get(16)?,
                commits_last_month: row.get(17)?,
                downloads_last_month: row.get(18)?,
            })
        })
        .map_err(|e| from_rusqlite(e).with_op("load_published"))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| from_rusqlite(e).with_op("load_published"))?;

    Ok(rows)
}

/// SHA-256 over the published rows as JSON lines, in name order.
///
/// Two publishes of the same consolidated data give the same digest.
pub fn published_digest(conn: &Connection) -> Result<String> {
    let mut hasher = Sha256::new();
    for record in load_published(conn)? {
        let line = serde_json::to_string(&record).map_err(|e| {
            ExError::new(ExErrorKind::Serialization)
                .with_op("published_digest")
                .with_entity_id(record.name.as_str())
                .with_message(e.to_string())
        })?;
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    Ok(hex::encode(hasher.finalize()))
}
