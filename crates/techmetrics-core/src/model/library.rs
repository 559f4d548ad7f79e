//! Canonical library identity

use crate::errors::MetricsError;
use serde::{Deserialize, Serialize};

/// Canonical name shared by both sources; the join key
///
/// Ordering is byte order of the name, which fixes the published row order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LibraryName(String);

impl LibraryName {
    /// Create a library name; surrounding whitespace is trimmed
    ///
    /// # Errors
    ///
    /// `MetricsError::EmptyLibraryName` if nothing remains after trimming.
    pub fn new(name: impl AsRef<str>) -> Result<Self, MetricsError> {
        let trimmed = name.as_ref().trim();
        if trimmed.is_empty() {
            return Err(MetricsError::EmptyLibraryName);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LibraryName {
    type Error = MetricsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LibraryName> for String {
    fn from(value: LibraryName) -> Self {
        value.0
    }
}

impl std::fmt::Display for LibraryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
