//! Data model for snapshot history and the published table

pub mod library;
pub mod published;
pub mod snapshot;

pub use library::LibraryName;
pub use published::{PublishedRecord, PUBLISHED_COLUMNS};
pub use snapshot::{DownloadSnapshot, GithubSnapshot, Recency, SnapshotRow};
