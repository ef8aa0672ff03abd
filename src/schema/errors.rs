//! Schema error types
//!
//! Error codes:
//! - SCHEMA_IO (file could not be read)
//! - SCHEMA_MALFORMED (file is not a valid schema overview)
//! - SCHEMA_INCONSISTENT (relations reference unknown collections)

use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while loading or validating a schema overview
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Schema file could not be read
    #[error("Failed to read schema file '{path}': {reason}")]
    Io { path: String, reason: String },

    /// Schema file is not valid JSON or has the wrong shape
    #[error("Malformed schema file '{path}': {reason}")]
    Malformed { path: String, reason: String },

    /// Schema parsed but references unknown collections
    #[error("Inconsistent schema: {0}")]
    Inconsistent(String),
}

impl SchemaError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::Io { .. } => "SCHEMA_IO",
            SchemaError::Malformed { .. } => "SCHEMA_MALFORMED",
            SchemaError::Inconsistent(_) => "SCHEMA_INCONSISTENT",
        }
    }

    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
