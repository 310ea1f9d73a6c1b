//! Error types for indexing and querying
//!
//! The taxonomy separates caller mistakes (malformed documents), storage
//! failures (connection, transaction, DDL), caller-requested cancellation and
//! filter rejections. Only the first three are errors; a [`FilterRejection`]
//! is a value that quietly removes a candidate from a result set.

use thiserror::Error;

/// Main error type for pipdb operations
#[derive(Error, Debug)]
pub enum SpatialError {
    /// Malformed input document. Not retryable.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Connection, transaction or DDL failure. Fatal to the current transaction.
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// A table failed while indexing or removing a record.
    #[error("Failed to index {table} table: {source}")]
    Table {
        table: String,
        #[source]
        source: Box<SpatialError>,
    },

    /// The caller cancelled the operation.
    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// No factory is registered for a URI scheme.
    #[error("Unknown scheme: {0}")]
    UnknownScheme(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl SpatialError {
    /// Create a validation error without a field name
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a validation error naming the offending field
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Wrap an error with the name of the table that produced it
    pub fn in_table(table: impl Into<String>, source: SpatialError) -> Self {
        Self::Table {
            table: table.into(),
            source: Box::new(source),
        }
    }

    /// Name of the failing table, if this error came from one
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::Table { table, .. } => Some(table),
            _ => None,
        }
    }

    /// Whether the caller asked for the operation to stop
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether the error is a storage-level failure, looking through table wrappers
    pub fn is_storage(&self) -> bool {
        match self {
            Self::Storage(_) | Self::Io(_) => true,
            Self::Table { source, .. } => source.is_storage(),
            _ => false,
        }
    }

    /// Whether the error is caused by the input document, looking through table wrappers
    pub fn is_validation(&self) -> bool {
        match self {
            Self::Validation { .. } => true,
            Self::Table { source, .. } => source.is_validation(),
            _ => false,
        }
    }

    /// Whether a caller may retry the operation unchanged
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(e) => !matches!(e, sqlx::Error::RowNotFound | sqlx::Error::ColumnNotFound(_)),
            Self::Io(_) => true,
            Self::Table { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// A candidate excluded by a filter. Not an error: candidates carrying one
/// are dropped from results without failing the query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("rejected by {filter}: {reason}")]
pub struct FilterRejection {
    pub filter: String,
    pub reason: String,
}

impl FilterRejection {
    pub fn new(filter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for pipdb operations
pub type SpatialResult<T> = std::result::Result<T, SpatialError>;
