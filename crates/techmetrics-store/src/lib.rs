//! TechMetrics Store - SQLite persistence for snapshot history and the published table
//!
//! Provides:
//! - SQLite schema with migrations framework
//! - Snapshot Store: batch append and full-history reads for both sources
//! - Publisher: all-or-nothing replacement of the published table

pub mod db;
pub mod errors;
pub mod migrations;
pub mod publish;
pub mod snapshots;

// Re-export key types
pub use errors::Result;
pub use publish::{
    load_published, publish, published_digest, NoopPublishHook, PublishHook, PublishReport,
    PublishState,
};
pub use snapshots::SnapshotRepo;
