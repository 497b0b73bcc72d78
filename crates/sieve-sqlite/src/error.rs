//! Error types for the SQLite backend

use sieve_query::QueryError;
use thiserror::Error;

/// SQLite backend error type
#[derive(Error, Debug)]
pub enum SqliteError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Criteria or envelope rejected by the compiler
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Table, column or alias name that cannot be emitted as a bare identifier
    #[error("Invalid SQL identifier: '{0}'")]
    InvalidIdentifier(String),

    /// Result column whose SQLite type has no JSON counterpart
    #[error("Unsupported value in column '{column}': {reason}")]
    UnsupportedValue { column: String, reason: String },

    /// Underlying rusqlite error
    #[error("SQLite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

/// Result type for SQLite operations
pub type SqliteResult<T> = Result<T, SqliteError>;
