//! SQL renderers for query envelopes.
//!
//! Renderers turn a [`DynamicQuery`] into a SQL string plus the named
//! parameters to bind to it.

mod join;
mod sqlite;

pub use join::{JoinPlan, PlannedJoin};
pub use sqlite::{SqlExpr, SqlPredicateBuilder, SqliteRenderer};

use crate::error::SqliteResult;
use serde_json::Value;
use sieve_query::DynamicQuery;
use std::collections::HashMap;

/// Output from rendering
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    /// The generated query string
    pub sql: String,
    /// Parameters to bind, keyed by name without the leading `:`
    pub params: HashMap<String, Value>,
}

/// Renders query envelopes for one SQL dialect.
pub trait QueryRenderer: Send + Sync {
    /// Unique name for this renderer
    fn name(&self) -> &str;

    /// Row query: projection, filters, grouping, ordering and paging
    fn render(&self, query: &DynamicQuery) -> SqliteResult<RenderedQuery>;

    /// Single-column `COUNT(*)` over the rows `render` would return without paging
    fn render_count(&self, query: &DynamicQuery) -> SqliteResult<RenderedQuery>;
}
