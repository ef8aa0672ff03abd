//! # Query Compiler Errors
//!
//! The compiler has a single failure kind: the query description cannot be
//! translated against the schema. Merely unsupported operator/value
//! combinations are skipped, not reported.

use thiserror::Error;

/// Result type for compiler operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Query compilation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Filter, sort, group or aggregate does not fit the schema
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl QueryError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        QueryError::InvalidQuery(reason.into())
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::InvalidQuery(_) => "INVALID_QUERY",
        }
    }

    /// Returns the human-readable reason without the prefix
    pub fn reason(&self) -> &str {
        match self {
            QueryError::InvalidQuery(reason) => reason,
        }
    }
}
