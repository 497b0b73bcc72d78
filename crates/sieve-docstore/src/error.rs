//! Error types for the document store

use sieve_query::QueryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocStoreError {
    /// Criteria or envelope rejected by the compiler
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Only JSON objects can be stored
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

pub type DocStoreResult<T> = Result<T, DocStoreError>;
