//! Refresh pipeline tests
//!
//! End-to-end resolve → join → publish against an on-disk store.
//!
//! ## Scenarios Covered
//!
//! 1. Superseded snapshot and registry-only library (worked example)
//! 2. GitHub-only library publishes with empty registry fields
//! 3. Re-running on unchanged history is idempotent
//! 4. Injected mid-insert failure leaves the previous table intact
//! 5. Read failure aborts before publishing
//! 6. Log events carry the run id

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Connection;
use tempfile::TempDir;
use techmetrics_core::errors::{ExError, ExErrorKind};
use techmetrics_core::logging_facility::test_capture::init_test_capture;
use techmetrics_core::model::{DownloadSnapshot, GithubSnapshot, LibraryName, PublishedRecord};
use techmetrics_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use techmetrics_engine::commands::refresh::run_refresh;
use techmetrics_store::{
    db, load_published, published_digest, NoopPublishHook, PublishHook, SnapshotRepo,
};

fn setup() -> (TempDir, Connection) {
    let dir = TempDir::new().unwrap();
    let conn = db::open_store(dir.path().join("store.db")).unwrap();
    (dir, conn)
}

fn t(n: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + n * 3600, 0).single().unwrap()
}

fn github(name: &str, stars: i64, collected_at: DateTime<Utc>) -> GithubSnapshot {
    GithubSnapshot {
        name: LibraryName::new(name).unwrap(),
        github_owner: format!("{}-dev", name.to_lowercase()),
        github_repository_name: name.to_lowercase(),
        stars,
        forks: 4,
        watchers: stars,
        open_issues: 2,
        language: Some("Python".into()),
        size_kb: 2048,
        created_at: Some("2012-02-02T00:00:00Z".into()),
        updated_at: Some("2025-05-05T00:00:00Z".into()),
        collected_at,
        total_contributors: Some(40),
        total_commits: Some(9000),
        commits_last_year: Some(300),
        commits_last_month: Some(25),
    }
}

fn downloads(name: &str, last_year: i64) -> DownloadSnapshot {
    DownloadSnapshot {
        name: LibraryName::new(name).unwrap(),
        pypi_name: name.to_lowercase(),
        total_downloads_alltime: last_year * 5,
        downloads_last_month: last_year / 12,
        downloads_last_year: last_year,
    }
}

struct FailAtRow(usize);

impl PublishHook for FailAtRow {
    fn before_insert(&self, index: usize, _record: &PublishedRecord) -> techmetrics_store::Result<()> {
        if index == self.0 {
            return Err(ExError::new(ExErrorKind::Io).with_message("simulated connectivity loss"));
        }
        Ok(())
    }
}

#[test]
fn test_worked_example_superseded_snapshot_and_registry_only_library() {
    // GIVEN A pulled twice and registry stats for A and B, with no GitHub row for B
    let (_dir, mut conn) = setup();
    SnapshotRepo::append_github(&mut conn, &[github("A", 5, t(1)), github("A", 10, t(2))]).unwrap();
    SnapshotRepo::append_downloads(&mut conn, &[downloads("A", 1000), downloads("B", 50)]).unwrap();

    // WHEN the refresh runs
    let summary = run_refresh(&mut conn, &NoopPublishHook).unwrap();

    // THEN exactly one row, for A, with the newer stars and A's downloads
    let published = load_published(&conn).unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].name.as_str(), "A");
    assert_eq!(published[0].stars, 10);
    assert_eq!(published[0].downloads_last_year, Some(1000));

    assert_eq!(summary.github_history_rows, 2);
    assert_eq!(summary.download_history_rows, 2);
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.dropped, vec![LibraryName::new("B").unwrap()]);
    assert_eq!(summary.rows_published, 1);
}

#[test]
fn test_github_only_library_is_published_with_null_registry_fields() {
    let (_dir, mut conn) = setup();
    SnapshotRepo::append_github(&mut conn, &[github("flask", 60, t(1)), github("numpy", 25, t(1))]).unwrap();
    SnapshotRepo::append_downloads(&mut conn, &[downloads("numpy", 800)]).unwrap();

    run_refresh(&mut conn, &NoopPublishHook).unwrap();

    let published = load_published(&conn).unwrap();
    let names: Vec<_> = published.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["flask", "numpy"]);

    let flask = &published[0];
    assert!(flask.pypi_name.is_none());
    assert!(flask.total_downloads_alltime.is_none());
    assert!(flask.downloads_last_year.is_none());
    assert!(flask.downloads_last_month.is_none());
    assert_eq!(flask.total_commits, Some(9000));

    let numpy = &published[1];
    assert_eq!(numpy.pypi_name.as_deref(), Some("numpy"));
    assert_eq!(numpy.total_downloads_alltime, Some(4000));
}

#[test]
fn test_registry_latest_uses_last_year_downloads_not_insertion_order() {
    let (_dir, mut conn) = setup();
    SnapshotRepo::append_github(&mut conn, &[github("pandas", 1, t(1))]).unwrap();
    SnapshotRepo::append_downloads(&mut conn, &[downloads("pandas", 900)]).unwrap();
    SnapshotRepo::append_downloads(&mut conn, &[downloads("pandas", 700)]).unwrap();

    run_refresh(&mut conn, &NoopPublishHook).unwrap();

    assert_eq!(load_published(&conn).unwrap()[0].downloads_last_year, Some(900));
}

#[test]
fn test_collected_at_tie_resolves_to_latest_insert() {
    let (_dir, mut conn) = setup();
    SnapshotRepo::append_github(&mut conn, &[github("attrs", 3, t(4))]).unwrap();
    SnapshotRepo::append_github(&mut conn, &[github("attrs", 4, t(4))]).unwrap();

    run_refresh(&mut conn, &NoopPublishHook).unwrap();

    assert_eq!(load_published(&conn).unwrap()[0].stars, 4);
}

#[test]
fn test_sub_millisecond_pulls_resolve_to_newest_not_last_inserted() {
    // GIVEN two pulls 600µs apart, the newer one appended first
    let (_dir, mut conn) = setup();
    let base = t(5);
    SnapshotRepo::append_github(
        &mut conn,
        &[github("httpx", 10, base + chrono::Duration::microseconds(800))],
    )
    .unwrap();
    SnapshotRepo::append_github(
        &mut conn,
        &[github("httpx", 5, base + chrono::Duration::microseconds(200))],
    )
    .unwrap();

    // WHEN the refresh runs
    run_refresh(&mut conn, &NoopPublishHook).unwrap();

    // THEN the newer pull wins even though it has the lower row id
    assert_eq!(load_published(&conn).unwrap()[0].stars, 10);
}

#[test]
fn test_refresh_twice_is_idempotent() {
    let (_dir, mut conn) = setup();
    SnapshotRepo::append_github(&mut conn, &[github("a", 1, t(1)), github("b", 2, t(1))]).unwrap();
    SnapshotRepo::append_downloads(&mut conn, &[downloads("a", 10)]).unwrap();

    run_refresh(&mut conn, &NoopPublishHook).unwrap();
    let first_rows = load_published(&conn).unwrap();
    let first_digest = published_digest(&conn).unwrap();

    let second = run_refresh(&mut conn, &NoopPublishHook).unwrap();

    assert_eq!(load_published(&conn).unwrap(), first_rows);
    assert_eq!(published_digest(&conn).unwrap(), first_digest);
    assert_eq!(second.rows_replaced, first_rows.len());
}

#[test]
fn test_failed_publish_leaves_previous_table_and_carries_run_id() {
    let (_dir, mut conn) = setup();
    SnapshotRepo::append_github(&mut conn, &[github("a", 1, t(1)), github("b", 2, t(1))]).unwrap();
    run_refresh(&mut conn, &NoopPublishHook).unwrap();
    let before = load_published(&conn).unwrap();

    // New pulls that would change the table
    SnapshotRepo::append_github(&mut conn, &[github("a", 100, t(2)), github("b", 200, t(2))]).unwrap();
    let err = run_refresh(&mut conn, &FailAtRow(1)).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::PublishFailed);
    assert!(err.run_id().is_some());
    assert_eq!(load_published(&conn).unwrap(), before);

    // The next clean run picks the new pulls up
    run_refresh(&mut conn, &NoopPublishHook).unwrap();
    assert_eq!(load_published(&conn).unwrap()[0].stars, 100);
}

#[test]
fn test_read_failure_aborts_without_publishing() {
    let (_dir, mut conn) = setup();
    SnapshotRepo::append_github(&mut conn, &[github("a", 1, t(1))]).unwrap();
    run_refresh(&mut conn, &NoopPublishHook).unwrap();
    let before = load_published(&conn).unwrap();

    conn.execute_batch("DROP TABLE pypi_download_stats").unwrap();
    SnapshotRepo::append_github(&mut conn, &[github("a", 50, t(2))]).unwrap();

    let err = run_refresh(&mut conn, &NoopPublishHook).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::Persistence);
    assert_eq!(err.op(), Some("load_download_history"));
    assert_eq!(load_published(&conn).unwrap(), before);
}

#[test]
fn test_empty_history_publishes_empty_table() {
    let (_dir, mut conn) = setup();
    let summary = run_refresh(&mut conn, &NoopPublishHook).unwrap();
    assert_eq!(summary.rows_published, 0);
    assert!(load_published(&conn).unwrap().is_empty());
}

#[test]
fn test_refresh_logs_start_and_end_with_run_id() {
    let capture = init_test_capture();
    let (_dir, mut conn) = setup();
    SnapshotRepo::append_github(&mut conn, &[github("a", 1, t(1))]).unwrap();

    let summary = run_refresh(&mut conn, &NoopPublishHook).unwrap();

    let events = capture.events_for("refresh", Some(summary.run_id.as_str()));
    let kinds: Vec<_> = events.iter().filter_map(|e| e.event.as_deref()).collect();
    assert_eq!(kinds, vec![EVENT_START, EVENT_END]);
    assert_eq!(events[1].field("rows_published"), Some("1"));
}

#[test]
fn test_failed_refresh_logs_end_error() {
    let capture = init_test_capture();
    let (_dir, mut conn) = setup();
    SnapshotRepo::append_github(&mut conn, &[github("a", 1, t(1))]).unwrap();

    let err = run_refresh(&mut conn, &FailAtRow(0)).unwrap_err();
    let run_id = err.run_id().unwrap().as_str().to_string();

    let events = capture.events_for("refresh", Some(&run_id));
    let error_event = events
        .iter()
        .find(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("end_error event");
    assert_eq!(error_event.field("err_code"), Some("ERR_PUBLISH_FAILED"));
}
