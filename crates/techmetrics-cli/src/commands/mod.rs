//! Subcommand implementations

pub mod ingest;
pub mod refresh;
pub mod show;

use std::path::Path;

use rusqlite::Connection;
use techmetrics_core::{logging_facility, Config};
use techmetrics_store::db;

/// Loaded configuration plus an open, migrated store
pub struct Session {
    pub config: Config,
    pub conn: Connection,
}

impl Session {
    /// Load config, start logging, and open the store
    ///
    /// `db_override` replaces the configured database path.
    pub fn open(
        config_path: Option<&Path>,
        db_override: Option<&Path>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = Config::load(config_path)?;
        if let Some(path) = db_override {
            config.database_path = path.to_path_buf();
        }

        logging_facility::init(config.log_profile);
        tracing::debug!(
            database = %config.database_path.display(),
            libraries = config.libraries.len(),
            "Configuration loaded"
        );

        let conn = db::open_store(&config.database_path)?;
        Ok(Self { config, conn })
    }
}
