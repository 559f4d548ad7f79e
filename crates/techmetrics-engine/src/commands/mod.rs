//! Pipeline commands: snapshot ingestion and consolidated republish

pub mod ingest;
pub mod refresh;

pub use ingest::{ingest_downloads, ingest_github, read_batch, DownloadRecord, IngestReport};
pub use refresh::{run_refresh, RefreshSummary};
