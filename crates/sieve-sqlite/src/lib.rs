//! SQLite backend for Sieve
//!
//! Compiles query envelopes into parameterized SQLite SQL and runs them over
//! a shared connection.
//!
//! ## Features
//!
//! - **SqliteRenderer**: envelope → `SELECT` / `COUNT(*)` with named parameters
//! - **Join planning**: key paths such as `dept.addr<city` become aliased
//!   `INNER` / `LEFT` / `RIGHT` joins from the entity schema's relation keys
//! - **SqliteExecutor**: [`QueryExecutor`](sieve_query::QueryExecutor) returning rows as JSON
//!   objects
//! - **WAL Mode**: configurable pragmas on the shared connection
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sieve_query::{Criterion, OperatorKind, QueryBuilder};
//! use sieve_sqlite::{SqliteExecutor, SqlitePool};
//!
//! let executor = SqliteExecutor::new(SqlitePool::memory()?, Arc::new(schema));
//! let rows = QueryBuilder::new(&executor)
//!     .filter(Criterion::single("name", OperatorKind::Contain, "Calc"))
//!     .fetch()?;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod render;

#[cfg(test)]
mod test_support;

// Re-exports
pub use config::SqliteConfig;
pub use connection::SqlitePool;
pub use error::{SqliteError, SqliteResult};
pub use executor::SqliteExecutor;
pub use render::{QueryRenderer, RenderedQuery, SqlExpr, SqlPredicateBuilder, SqliteRenderer};
