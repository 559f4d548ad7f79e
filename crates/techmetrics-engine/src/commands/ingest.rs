//! Snapshot ingestion: the landing surface for the extraction collaborators.
//!
//! Each call validates a whole batch first and then appends it in one
//! transaction, so a batch is either fully stored or not at all.

use std::path::Path;
use std::time::Instant;

use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use techmetrics_core::errors::{ExError, ExErrorKind, MetricsError, Result};
use techmetrics_core::model::{DownloadSnapshot, GithubSnapshot, LibraryName};
use techmetrics_core::{log_op_end, log_op_error, log_op_start, Config};
use techmetrics_core_types::RunId;
use techmetrics_store::SnapshotRepo;

/// Registry extract row as produced by the warehouse query
///
/// `name` may be omitted; it is then looked up from the configured library
/// list by `pypi_name`. When both are present and the package is configured,
/// they must agree.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DownloadRecord {
    #[serde(default)]
    pub name: Option<String>,
    pub pypi_name: String,
    pub total_downloads_alltime: i64,
    pub downloads_last_month: i64,
    pub downloads_last_year: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub run_id: RunId,
    pub source: &'static str,
    pub rows_appended: usize,
}

/// Read a JSON array of records from a file
///
/// ## Errors
///
/// `Io` if the file cannot be read, `Serialization` if it is not a JSON
/// array of the expected shape.
pub fn read_batch<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ExError::new(ExErrorKind::Io)
            .with_op("read_batch")
            .with_message(format!("Cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&text).map_err(|e| {
        ExError::new(ExErrorKind::Serialization)
            .with_op("read_batch")
            .with_message(format!("Invalid batch {}: {}", path.display(), e))
    })
}

/// Validate and append a batch of GitHub-side snapshots
pub fn ingest_github(conn: &mut Connection, batch: &[GithubSnapshot]) -> Result<IngestReport> {
    traced("ingest_github", "github", || {
        for snap in batch {
            snap.validate()?;
        }
        SnapshotRepo::append_github(conn, batch)
    })
}

/// Resolve library names, validate, and append a batch of registry snapshots
pub fn ingest_downloads(
    conn: &mut Connection,
    config: &Config,
    batch: Vec<DownloadRecord>,
) -> Result<IngestReport> {
    traced("ingest_downloads", "pypi", || {
        let snapshots = batch
            .into_iter()
            .map(|record| to_snapshot(config, record))
            .collect::<Result<Vec<_>>>()?;
        SnapshotRepo::append_downloads(conn, &snapshots)
    })
}

fn to_snapshot(config: &Config, record: DownloadRecord) -> Result<DownloadSnapshot> {
    let configured = config.library_for_package(&record.pypi_name);
    let name = match (record.name, configured) {
        (Some(given), Some(lib)) => {
            let given = LibraryName::new(given)?;
            if given != lib.name {
                return Err(MetricsError::PackageNameMismatch {
                    pypi_name: record.pypi_name,
                    configured: lib.name.to_string(),
                    given: given.to_string(),
                }
                .into());
            }
            given
        }
        // Packages outside the configured list keep the name they arrived with
        (Some(given), None) => LibraryName::new(given)?,
        (None, Some(lib)) => lib.name.clone(),
        (None, None) => {
            return Err(MetricsError::UnknownPackage {
                pypi_name: record.pypi_name,
            }
            .into())
        }
    };

    let snapshot = DownloadSnapshot {
        name,
        pypi_name: record.pypi_name,
        total_downloads_alltime: record.total_downloads_alltime,
        downloads_last_month: record.downloads_last_month,
        downloads_last_year: record.downloads_last_year,
    };
    snapshot.validate()?;
    Ok(snapshot)
}

fn traced<F>(op: &'static str, source: &'static str, body: F) -> Result<IngestReport>
where
    F: FnOnce() -> Result<usize>,
{
    let run_id = RunId::new();
    let started = Instant::now();
    log_op_start!(op, run_id = %run_id, source = source);

    match body() {
        Ok(rows_appended) => {
            log_op_end!(
                op,
                duration_ms = started.elapsed().as_millis() as u64,
                run_id = %run_id,
                rows_appended = rows_appended,
            );
            Ok(IngestReport {
                run_id,
                source,
                rows_appended,
            })
        }
        Err(err) => {
            let err = err.with_run_id(run_id.clone());
            log_op_error!(
                op,
                err.clone(),
                duration_ms = started.elapsed().as_millis() as u64,
                run_id = %run_id,
            );
            Err(err)
        }
    }
}
