//! [`QueryExecutor`] over a [`SqlitePool`].

use crate::config::SqliteConfig;
use crate::connection::SqlitePool;
use crate::error::{SqliteError, SqliteResult};
use crate::render::{QueryRenderer, RenderedQuery, SqliteRenderer};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, ToSql};
use serde_json::{Number, Value as RawValue};
use sieve_config::SieveConfig;
use sieve_query::{
    consume_partially, CompileOptions, Criterion, DynamicQuery, Page, QueryExecutor, Row, Schema,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Runs query envelopes against SQLite and returns rows as JSON objects.
pub struct SqliteExecutor {
    pool: SqlitePool,
    renderer: SqliteRenderer,
}

impl SqliteExecutor {
    pub fn new(pool: SqlitePool, schema: Arc<Schema>) -> Self {
        Self {
            pool,
            renderer: SqliteRenderer::new(schema),
        }
    }

    /// Open the configured database and apply the configured query options
    pub fn from_config(config: &SieveConfig, schema: Arc<Schema>) -> SqliteResult<Self> {
        let pool = SqlitePool::new(SqliteConfig::from(&config.storage))?;
        info!(root = %schema.root().name, "SQLite executor ready");
        Ok(Self::new(pool, schema).with_options(CompileOptions::from(&config.query)))
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.renderer = self.renderer.with_options(options);
        self
    }

    pub fn with_renderer(mut self, renderer: SqliteRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn renderer(&self) -> &SqliteRenderer {
        &self.renderer
    }

    /// Walk the whole result in batches of the configured default page size
    pub fn consume_all<F>(&self, query: &DynamicQuery, consumer: F) -> SqliteResult<u64>
    where
        F: FnMut(Vec<Row>) -> SqliteResult<()>,
    {
        let page_size = self.renderer.options().default_page_size;
        consume_partially(self, query, page_size, consumer)
    }

    fn count_rendered(&self, rendered: &RenderedQuery) -> SqliteResult<u64> {
        self.pool.with_connection(|conn| {
            let mut stmt = conn.prepare(&rendered.sql)?;
            let bound = bind_params(&rendered.params);
            let count: i64 = stmt.query_row(named(&bound).as_slice(), |row| row.get(0))?;
            Ok(u64::try_from(count).unwrap_or_default())
        })
    }
}

/// `(":name", value)` pairs ready for rusqlite
fn bind_params(params: &std::collections::HashMap<String, RawValue>) -> Vec<(String, SqlValue)> {
    params
        .iter()
        .map(|(name, value)| (format!(":{}", name), to_sql_value(value)))
        .collect()
}

fn named(bound: &[(String, SqlValue)]) -> Vec<(&str, &dyn ToSql)> {
    bound
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect()
}

fn to_sql_value(value: &RawValue) -> SqlValue {
    match value {
        RawValue::Null => SqlValue::Null,
        RawValue::Bool(b) => SqlValue::Integer(i64::from(*b)),
        RawValue::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        RawValue::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn to_json(column: &str, value: ValueRef<'_>) -> SqliteResult<RawValue> {
    Ok(match value {
        ValueRef::Null => RawValue::Null,
        ValueRef::Integer(i) => RawValue::from(i),
        ValueRef::Real(f) => Number::from_f64(f)
            .map(RawValue::Number)
            .ok_or_else(|| SqliteError::UnsupportedValue {
                column: column.to_string(),
                reason: format!("non-finite real {}", f),
            })?,
        ValueRef::Text(bytes) => RawValue::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => {
            RawValue::Array(bytes.iter().map(|b| RawValue::from(*b)).collect())
        }
    })
}

fn query_rows(conn: &Connection, rendered: &RenderedQuery) -> SqliteResult<Vec<Row>> {
    let mut stmt = conn.prepare(&rendered.sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let bound = bind_params(&rendered.params);

    let mut rows = stmt.query(named(&bound).as_slice())?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Row::new();
        for (index, column) in columns.iter().enumerate() {
            record.insert(column.clone(), to_json(column, row.get_ref(index)?)?);
        }
        out.push(record);
    }
    Ok(out)
}

impl QueryExecutor for SqliteExecutor {
    type Error = SqliteError;

    fn execute(&self, query: &DynamicQuery) -> SqliteResult<Vec<Row>> {
        let rendered = self.renderer.render(query)?;
        let rows = self.pool.with_connection(|conn| query_rows(conn, &rendered))?;
        debug!(rows = rows.len(), "Executed SQLite query");
        Ok(rows)
    }

    fn execute_as_page(&self, query: &DynamicQuery) -> SqliteResult<Page<Row>> {
        let page = query.page_request()?;
        let content = self.execute(query)?;
        let total_elements = self.count_rendered(&self.renderer.render_count(query)?)?;
        Ok(Page::new(content, page.number, page.size, total_elements))
    }

    fn count(&self, criteria: &[Criterion]) -> SqliteResult<u64> {
        let query = DynamicQuery::with_criteria(criteria.to_vec());
        self.count_rendered(&self.renderer.render_count(&query)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_sql_value() {
        assert_eq!(to_sql_value(&json!(null)), SqlValue::Null);
        assert_eq!(to_sql_value(&json!(true)), SqlValue::Integer(1));
        assert_eq!(to_sql_value(&json!(42)), SqlValue::Integer(42));
        assert_eq!(to_sql_value(&json!(2.5)), SqlValue::Real(2.5));
        assert_eq!(to_sql_value(&json!("x")), SqlValue::Text("x".to_string()));
    }

    #[test]
    fn test_to_json() {
        assert_eq!(to_json("c", ValueRef::Integer(3)).unwrap(), json!(3));
        assert_eq!(to_json("c", ValueRef::Real(1.5)).unwrap(), json!(1.5));
        assert_eq!(to_json("c", ValueRef::Text(b"hi")).unwrap(), json!("hi"));
        assert_eq!(to_json("c", ValueRef::Blob(&[1, 2])).unwrap(), json!([1, 2]));
        assert!(matches!(
            to_json("c", ValueRef::Real(f64::INFINITY)),
            Err(SqliteError::UnsupportedValue { .. })
        ));
    }
}
