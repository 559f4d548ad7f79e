//! TechMetrics Core - snapshot model, latest-record resolution and consolidation
//!
//! This crate holds the storage-independent parts of the pipeline:
//! - Library identity and per-source snapshot models
//! - Snapshot Resolver: one latest row per library per source
//! - Consolidator: left outer join onto the published record shape
//! - Configuration, error facility and structured logging facility

pub mod config;
pub mod consolidate;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod resolver;

// Re-export commonly used types
pub use config::{Config, LibrarySpec};
pub use consolidate::{consolidate, Consolidation};
pub use errors::{ExError, ExErrorKind, MetricsError, Result};
pub use model::{
    DownloadSnapshot, GithubSnapshot, LibraryName, PublishedRecord, SnapshotRow, PUBLISHED_COLUMNS,
};
pub use resolver::{resolve_latest, resolve_latest_downloads, resolve_latest_github, LatestSet};
