//! Error types for fraud-etl
//!
//! This module defines the error hierarchy for the whole job.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use crate::types::Stage;
use thiserror::Error;

/// The main error type for fraud-etl
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required job parameter: {field}")]
    MissingParameter { field: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Source Errors
    // ============================================================================
    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Access denied: {what}: {message}")]
    AccessDenied { what: String, message: String },

    // ============================================================================
    // Mapping Errors
    // ============================================================================
    #[error("Schema mismatch on field '{field}'{}: {message}", row_suffix(.row))]
    SchemaMismatch {
        field: String,
        row: Option<usize>,
        message: String,
    },

    #[error("Cannot cast field '{field}' at row {row} (value {value}) to {target}")]
    Cast {
        field: String,
        row: usize,
        value: String,
        target: String,
    },

    // ============================================================================
    // Sink Errors
    // ============================================================================
    #[error("Failed to write {path}: {message}")]
    Write { path: String, message: String },

    // ============================================================================
    // Backend Errors
    // ============================================================================
    #[error("Storage error: {0}")]
    Storage(#[from] object_store::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Job Errors
    // ============================================================================
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Other(String),
}

fn row_suffix(row: &Option<usize>) -> String {
    row.map(|r| format!(" at row {r}")).unwrap_or_default()
}

/// Coarse error classification, stable across stage wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    NotFound,
    AccessDenied,
    SchemaMismatch,
    Cast,
    Write,
    Internal,
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing parameter error
    pub fn missing_parameter(field: impl Into<String>) -> Self {
        Self::MissingParameter {
            field: field.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create an access-denied error
    pub fn access_denied(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AccessDenied {
            what: what.into(),
            message: message.into(),
        }
    }

    /// Create a schema mismatch error for a whole column
    pub fn schema_mismatch(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            field: field.into(),
            row: None,
            message: message.into(),
        }
    }

    /// Create a schema mismatch error for a single record
    pub fn record_mismatch(field: impl Into<String>, row: usize, message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            field: field.into(),
            row: Some(row),
            message: message.into(),
        }
    }

    /// Create a write error
    pub fn write(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Write {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Tag this error with the stage it happened in
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            already @ Self::Stage { .. } => already,
            other => Self::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error was tagged with, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The innermost error, with stage tags removed
    pub fn root(&self) -> &Error {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            Self::Config { .. }
            | Self::MissingParameter { .. }
            | Self::YamlParse(_)
            | Self::JsonParse(_) => ErrorKind::Config,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AccessDenied { .. } => ErrorKind::AccessDenied,
            Self::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            Self::Cast { .. } => ErrorKind::Cast,
            Self::Write { .. } => ErrorKind::Write,
            _ => ErrorKind::Internal,
        }
    }

    /// Map an object store failure on a read path into the source taxonomy
    pub fn from_read(err: object_store::Error, what: &str) -> Self {
        match err {
            object_store::Error::NotFound { .. } => Self::not_found(what),
            object_store::Error::PermissionDenied { source, .. }
            | object_store::Error::Unauthenticated { source, .. } => {
                Self::access_denied(what, source.to_string())
            }
            other => Self::Storage(other),
        }
    }

    /// Map a local I/O failure on a read path into the source taxonomy
    pub fn from_read_io(err: std::io::Error, what: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(what),
            std::io::ErrorKind::PermissionDenied => Self::access_denied(what, err.to_string()),
            _ => Self::Io(err),
        }
    }

    /// Map a DuckDB failure on a read path into the source taxonomy
    ///
    /// DuckDB reports every failure with the same result code, so the
    /// message is the only thing to classify on.
    pub fn from_read_duckdb(err: duckdb::Error, what: &str) -> Self {
        let message = err.to_string();
        if message.contains("Permission denied") {
            Self::access_denied(what, message)
        } else if message.contains("Catalog Error") && message.contains("does not exist") {
            Self::not_found(what)
        } else {
            Self::DuckDb(err)
        }
    }
}

/// Result type alias for fraud-etl
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
