//! Pipeline configuration
//!
//! Built once at startup and passed by reference. Sources, lowest to highest
//! precedence: built-in defaults, the JSON config file, environment variables
//! (a `.env` file is loaded first), explicit CLI overrides applied by the caller.
//!
//! ```json
//! {
//!   "database_path": ".techmetrics/store.db",
//!   "libraries": [
//!     { "name": "requests", "github_owner": "psf", "github_repo": "requests", "pypi_package": "requests" }
//!   ]
//! }
//! ```

use crate::errors::{MetricsError, Result};
use crate::logging_facility::Profile;
use crate::model::LibraryName;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_DATABASE_PATH: &str = ".techmetrics/store.db";

pub const ENV_CONFIG_PATH: &str = "TECHMETRICS_CONFIG";
pub const ENV_DATABASE_PATH: &str = "TECHMETRICS_DB";
pub const ENV_LOG_PROFILE: &str = "TECHMETRICS_LOG";

/// One tracked library and its identifiers in each source
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LibrarySpec {
    pub name: LibraryName,
    pub github_owner: String,
    pub github_repo: String,
    pub pypi_package: String,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    log_profile: Option<String>,
    #[serde(default)]
    libraries: Vec<LibrarySpec>,
}

/// Resolved configuration for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: PathBuf,
    pub log_profile: Profile,
    pub libraries: Vec<LibrarySpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            log_profile: Profile::Development,
            libraries: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from file and process environment
    ///
    /// `explicit_path` wins over `TECHMETRICS_CONFIG`. A missing file is an
    /// error only when the path was given explicitly; otherwise defaults apply.
    ///
    /// # Errors
    ///
    /// `Io` if an explicit file cannot be read, `InvalidConfig` if it does not
    /// parse or fails validation.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // A missing .env is normal
        dotenvy::dotenv().ok();

        let env_path = std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from);
        let required = explicit_path.is_some() || env_path.is_some();
        let path = explicit_path
            .map(Path::to_path_buf)
            .or(env_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut config = match std::fs::read_to_string(&path) {
            Ok(text) => Self::from_json_str(&text, &path)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                Self::default()
            }
            Err(e) => {
                return Err(MetricsError::ConfigRead {
                    path: path.display().to_string(),
                    message: e.to_string(),
                }
                .into())
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse and validate a JSON config document
    ///
    /// # Errors
    ///
    /// `InvalidConfig` on malformed JSON, an unknown log profile, or a
    /// duplicate library name or registry package.
    pub fn from_json_str(text: &str, origin: &Path) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(text).map_err(|e| MetricsError::ConfigParse {
            path: origin.display().to_string(),
            message: e.to_string(),
        })?;

        let defaults = Self::default();
        let log_profile = match file.log_profile {
            Some(value) => value.parse()?,
            None => defaults.log_profile,
        };

        let config = Self {
            database_path: file.database_path.unwrap_or(defaults.database_path),
            log_profile,
            libraries: file.libraries,
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the log profile variable holds an unknown value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup(ENV_DATABASE_PATH).filter(|v| !v.trim().is_empty()) {
            self.database_path = PathBuf::from(db);
        }
        if let Some(profile) = lookup(ENV_LOG_PROFILE).filter(|v| !v.trim().is_empty()) {
            self.log_profile = profile.parse()?;
        }
        Ok(())
    }

    /// Library that publishes the given registry package, if configured
    pub fn library_for_package(&self, pypi_package: &str) -> Option<&LibrarySpec> {
        self.libraries
            .iter()
            .find(|lib| lib.pypi_package == pypi_package)
    }

    fn validate(&self) -> std::result::Result<(), MetricsError> {
        let mut names = HashSet::new();
        let mut packages = HashSet::new();
        for lib in &self.libraries {
            if !names.insert(lib.name.as_str()) {
                return Err(MetricsError::DuplicateLibrary {
                    name: lib.name.to_string(),
                });
            }
            if !packages.insert(lib.pypi_package.as_str()) {
                return Err(MetricsError::DuplicatePackage {
                    package: lib.pypi_package.clone(),
                });
            }
        }
        Ok(())
    }
}
