use techmetrics_core_types::RunId;
use thiserror::Error;

/// Result type alias using the canonical structured error
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, testing, and log assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Structural/Validation
    InvalidInput,
    InvalidConfig,
    UnknownLibrary,
    ConstraintViolation,

    // Integration/IO
    Io,
    Serialization,
    Persistence,
    /// Any failure after the publish transaction opened; the old table was restored
    PublishFailed,
    Concurrency,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::UnknownLibrary => "ERR_UNKNOWN_LIBRARY",
            ExErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::PublishFailed => "ERR_PUBLISH_FAILED",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
        }
    }
}

/// Canonical structured error type
///
/// Carries classification fields for programmatic handling and context
/// (operation, library, run) for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    run_id: Option<RunId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            run_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity context (usually a library name)
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add run correlation context
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the run context, if any
    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (library: {})", entity_id)?;
        }
        if let Some(source) = &self.source {
            write!(f, "; caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain errors raised by validation and configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    /// Library identity was empty or whitespace-only
    #[error("Library name must not be empty")]
    EmptyLibraryName,

    /// A counter that can only grow from zero was negative
    #[error("Field {field} of {library} must be non-negative, got {value}")]
    NegativeCounter {
        library: String,
        field: &'static str,
        value: i64,
    },

    /// Registry package not present in the configured library list
    #[error("No configured library for registry package {pypi_name}")]
    UnknownPackage { pypi_name: String },

    /// Record names a different library than the one configured for its package
    #[error("Registry package {pypi_name} belongs to {configured}, not {given}")]
    PackageNameMismatch {
        pypi_name: String,
        configured: String,
        given: String,
    },

    /// Same library name configured twice
    #[error("Library {name} is configured more than once")]
    DuplicateLibrary { name: String },

    /// Same registry package claimed by two libraries
    #[error("Registry package {package} is configured more than once")]
    DuplicatePackage { package: String },

    /// Config file could not be read
    #[error("Cannot read config {path}: {message}")]
    ConfigRead { path: String, message: String },

    /// Config file is not valid JSON for the expected shape
    #[error("Cannot parse config {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// Unrecognised logging profile name
    #[error("Unknown log profile: {value}")]
    InvalidLogProfile { value: String },
}

impl From<MetricsError> for ExError {
    fn from(err: MetricsError) -> Self {
        let message = err.to_string();
        match err {
            MetricsError::EmptyLibraryName => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }
            MetricsError::NegativeCounter { library, .. } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_entity_id(library)
                    .with_message(message)
            }
            MetricsError::UnknownPackage { .. } => {
                ExError::new(ExErrorKind::UnknownLibrary).with_message(message)
            }
            MetricsError::PackageNameMismatch { given, .. } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_entity_id(given)
                    .with_message(message)
            }
            MetricsError::DuplicateLibrary { name } => ExError::new(ExErrorKind::InvalidConfig)
                .with_entity_id(name)
                .with_message(message),
            MetricsError::DuplicatePackage { .. } | MetricsError::InvalidLogProfile { .. } => {
                ExError::new(ExErrorKind::InvalidConfig).with_message(message)
            }
            MetricsError::ConfigRead { .. } => ExError::new(ExErrorKind::Io)
                .with_op("load_config")
                .with_message(message),
            MetricsError::ConfigParse { .. } => ExError::new(ExErrorKind::InvalidConfig)
                .with_op("load_config")
                .with_message(message),
        }
    }
}
