//! CLI integration tests
//!
//! Drive the `techmetrics` binary against a temporary store: ingest both
//! sources, run the default refresh, and read the published table back.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use rusqlite::Connection;
use tempfile::TempDir;

const GITHUB_BATCH: &str = r#"[
  {"name": "numpy", "github_owner": "numpy", "github_repository_name": "numpy",
   "stars": 25000, "forks": 9000, "watchers": 25000, "open_issues": 2000,
   "language": "Python", "size_kb": 100000, "collected_at": "2025-01-01T00:00:00Z"},
  {"name": "numpy", "github_owner": "numpy", "github_repository_name": "numpy",
   "stars": 26000, "forks": 9100, "watchers": 26000, "open_issues": 2100,
   "language": "Python", "size_kb": 100500, "collected_at": "2025-02-01T00:00:00Z"},
  {"name": "flask", "github_owner": "pallets", "github_repository_name": "flask",
   "stars": 65000, "forks": 16000, "watchers": 65000, "open_issues": 5,
   "language": "Python", "size_kb": 9000, "collected_at": "2025-02-01T00:00:00Z"}
]"#;

const DOWNLOAD_BATCH: &str = r#"[
  {"pypi_name": "numpy", "total_downloads_alltime": 9000000,
   "downloads_last_month": 150000, "downloads_last_year": 1800000},
  {"name": "requests", "pypi_name": "requests", "total_downloads_alltime": 12000000,
   "downloads_last_month": 200000, "downloads_last_year": 2400000}
]"#;

const CONFIG: &str = r#"{
  "libraries": [
    {"name": "numpy", "github_owner": "numpy", "github_repo": "numpy", "pypi_package": "numpy"},
    {"name": "flask", "github_owner": "pallets", "github_repo": "flask", "pypi_package": "flask"}
  ]
}"#;

struct TestRepo {
    dir: TempDir,
    db_path: PathBuf,
}

impl TestRepo {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.json"), CONFIG).unwrap();
        fs::write(dir.path().join("github.json"), GITHUB_BATCH).unwrap();
        fs::write(dir.path().join("downloads.json"), DOWNLOAD_BATCH).unwrap();
        let db_path = dir.path().join("data").join("store.db");
        Self { dir, db_path }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_techmetrics"))
            .current_dir(self.path())
            .env_remove("TECHMETRICS_CONFIG")
            .env_remove("TECHMETRICS_DB")
            .env_remove("TECHMETRICS_LOG")
            .env_remove("RUST_LOG")
            .args(["--db", self.db_path.to_str().unwrap()])
            .args(args)
            .output()
            .expect("Failed to execute CLI")
    }
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "CLI command should succeed. Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_cli_ingest_refresh_show() {
    let repo = TestRepo::new();

    assert_success(&repo.run(&["ingest", "github", "github.json"]));
    assert_success(&repo.run(&["ingest", "downloads", "downloads.json"]));

    // No subcommand: the scheduled refresh
    let refresh = repo.run(&[]);
    assert_success(&refresh);
    assert!(String::from_utf8_lossy(&refresh.stdout).contains("published 2 rows"));

    let show = repo.run(&["show"]);
    assert_success(&show);
    let stdout = String::from_utf8_lossy(&show.stdout);
    let rows: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], "flask");
    assert!(rows[0]["downloads_last_year"].is_null());
    assert_eq!(rows[1]["name"], "numpy");
    assert_eq!(rows[1]["stars"], 26000);
    assert_eq!(rows[1]["downloads_last_year"], 1800000);
}

#[test]
fn test_cli_refresh_on_fresh_store_publishes_empty_table() {
    let repo = TestRepo::new();

    assert_success(&repo.run(&["refresh"]));

    let conn = Connection::open(&repo.db_path).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM tech_metrics", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn test_cli_unknown_package_exits_non_zero() {
    let repo = TestRepo::new();
    fs::write(
        repo.path().join("bad.json"),
        r#"[{"pypi_name": "left-pad", "total_downloads_alltime": 1,
             "downloads_last_month": 1, "downloads_last_year": 1}]"#,
    )
    .unwrap();

    let output = repo.run(&["ingest", "downloads", "bad.json"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERR_UNKNOWN_LIBRARY"));
}

#[test]
fn test_cli_refresh_failure_exits_non_zero_and_keeps_table() {
    let repo = TestRepo::new();
    assert_success(&repo.run(&["ingest", "github", "github.json"]));
    assert_success(&repo.run(&[]));

    let conn = Connection::open(&repo.db_path).unwrap();
    conn.execute_batch("DROP TABLE github_repo_metrics").unwrap();
    drop(conn);

    let output = repo.run(&[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERR_PERSISTENCE"));

    let conn = Connection::open(&repo.db_path).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM tech_metrics", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 2);
}
