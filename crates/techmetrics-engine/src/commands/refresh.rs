//! Consolidated republish: resolve → join → publish.
//!
//! ## Pipeline (in order):
//! 1. Load both snapshot histories (read failure aborts, nothing published)
//! 2. Resolve the latest snapshot per library per source
//! 3. Left-join on library name, GitHub side driving
//! 4. Publish atomically (failure restores the previous table)
//!
//! Runs are strictly sequential and never retried here; the caller decides.

use std::time::Instant;

use rusqlite::Connection;
use techmetrics_core::errors::Result;
use techmetrics_core::model::LibraryName;
use techmetrics_core::{
    consolidate, log_op_end, log_op_error, log_op_start, resolve_latest_downloads,
    resolve_latest_github,
};
use techmetrics_core_types::RunId;
use techmetrics_store::{publish, PublishHook, SnapshotRepo};

/// What a successful refresh did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSummary {
    pub run_id: RunId,
    pub github_history_rows: usize,
    pub download_history_rows: usize,
    pub github_libraries: usize,
    pub download_libraries: usize,
    /// Published rows that found registry statistics
    pub matched: usize,
    /// Registry-only libraries left out of the published table
    pub dropped: Vec<LibraryName>,
    pub rows_published: usize,
    pub rows_replaced: usize,
}

/// Rebuild the published table from the current snapshot history
///
/// ## Errors
///
/// - `ExErrorKind::Persistence`: a snapshot history could not be read
/// - `ExErrorKind::PublishFailed`: the publish rolled back; old table intact
///
/// Every error carries the run id.
pub fn run_refresh(conn: &mut Connection, hook: &dyn PublishHook) -> Result<RefreshSummary> {
    let run_id = RunId::new();
    let started = Instant::now();
    log_op_start!("refresh", run_id = %run_id);

    match refresh(conn, hook, &run_id) {
        Ok(summary) => {
            log_op_end!(
                "refresh",
                duration_ms = started.elapsed().as_millis() as u64,
                run_id = %run_id,
                rows_published = summary.rows_published,
                dropped = summary.dropped.len(),
            );
            Ok(summary)
        }
        Err(err) => {
            let err = err.with_run_id(run_id.clone());
            log_op_error!(
                "refresh",
                err.clone(),
                duration_ms = started.elapsed().as_millis() as u64,
                run_id = %run_id,
            );
            Err(err)
        }
    }
}

fn refresh(conn: &mut Connection, hook: &dyn PublishHook, run_id: &RunId) -> Result<RefreshSummary> {
    let github_history = SnapshotRepo::load_github_history(conn)?;
    let download_history = SnapshotRepo::load_download_history(conn)?;
    let github_history_rows = github_history.len();
    let download_history_rows = download_history.len();

    let github_latest = resolve_latest_github(github_history);
    let downloads_latest = resolve_latest_downloads(download_history);

    let consolidation = consolidate(&github_latest, &downloads_latest);
    tracing::info!(
        run_id = %run_id,
        github_libraries = github_latest.len(),
        download_libraries = downloads_latest.len(),
        matched = consolidation.matched_count(),
        dropped = consolidation.dropped.len(),
        "Consolidated latest snapshots"
    );

    let report = publish(conn, &consolidation.records, hook)?;

    Ok(RefreshSummary {
        run_id: run_id.clone(),
        github_history_rows,
        download_history_rows,
        github_libraries: github_latest.len(),
        download_libraries: downloads_latest.len(),
        matched: consolidation.matched_count(),
        dropped: consolidation.dropped,
        rows_published: report.rows_published,
        rows_replaced: report.rows_replaced,
    })
}
