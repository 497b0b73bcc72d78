//! SQLite query renderer.
//!
//! Renders query envelopes to SQLite SQL with:
//! - table aliases and JOINs planned from key paths
//! - named parameter binding (`:p0`, `:p1`, …) for every criterion value
//! - `LIKE … ESCAPE '\'` for case-insensitive and `GLOB` for case-sensitive
//!   text matching

use crate::error::{SqliteError, SqliteResult};
use crate::render::join::{identifier, JoinPlan};
use crate::render::{QueryRenderer, RenderedQuery};
use serde_json::Value as RawValue;
use sieve_query::{
    resolve, CompileOptions, Comparison, CriteriaCompiler, Criterion, Direction, DynamicQuery,
    PredicateBuilder, ResolvedPath, RuleRegistry, Schema, Selection, TextMatch, Value,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A boolean SQL expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlExpr(pub String);

impl fmt::Display for SqlExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

const ALWAYS_TRUE: &str = "1 = 1";
const ALWAYS_FALSE: &str = "1 = 0";

/// Predicate builder producing SQL fragments over a [`JoinPlan`].
///
/// Builder methods cannot fail, so a key path the plan rejects is recorded
/// and surfaced by [`check`](Self::check) once compilation returns.
pub struct SqlPredicateBuilder<'s> {
    plan: JoinPlan<'s>,
    params: HashMap<String, RawValue>,
    failure: Option<SqliteError>,
}

impl<'s> SqlPredicateBuilder<'s> {
    pub fn new(schema: &'s Schema) -> SqliteResult<Self> {
        Ok(Self {
            plan: JoinPlan::new(schema)?,
            params: HashMap::new(),
            failure: None,
        })
    }

    /// Qualified column for `path`
    pub fn column(&mut self, path: &ResolvedPath) -> SqliteResult<String> {
        self.plan.column(path)
    }

    /// Error recorded while building, if any
    pub fn check(&mut self) -> SqliteResult<()> {
        match self.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn plan(&self) -> &JoinPlan<'s> {
        &self.plan
    }

    pub fn into_params(self) -> HashMap<String, RawValue> {
        self.params
    }

    fn bind(&mut self, value: RawValue) -> String {
        let name = format!("p{}", self.params.len());
        let placeholder = format!(":{}", name);
        self.params.insert(name, value);
        placeholder
    }

    fn column_or_record(&mut self, path: &ResolvedPath) -> String {
        match self.plan.column(path) {
            Ok(column) => column,
            Err(err) => {
                self.failure.get_or_insert(err);
                "NULL".to_string()
            }
        }
    }

    fn join(&self, predicates: Vec<SqlExpr>, separator: &str, empty: &str) -> SqlExpr {
        if predicates.is_empty() {
            return SqlExpr(empty.to_string());
        }
        let parts: Vec<String> = predicates.into_iter().map(|p| p.0).collect();
        SqlExpr(format!("({})", parts.join(separator)))
    }
}

/// Bind value for a typed comparison value
fn to_param(value: &Value) -> RawValue {
    match value {
        // SQLite has no boolean storage class
        Value::Boolean(b) => RawValue::from(i64::from(*b)),
        other => other.to_json(),
    }
}

/// Date and date-time text only compares chronologically through `julianday`,
/// since stored values may carry `Z`, an offset, or a space separator
fn is_temporal(value: &Value) -> bool {
    matches!(value, Value::Date(_) | Value::DateTime(_))
}

fn like_pattern(pattern: &str, mode: TextMatch) -> String {
    let mut escaped = String::with_capacity(pattern.len() + 2);
    for c in pattern.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    match mode {
        TextMatch::Contains => format!("%{}%", escaped),
        TextMatch::StartsWith => format!("{}%", escaped),
        TextMatch::EndsWith => format!("%{}", escaped),
    }
}

fn glob_pattern(pattern: &str, mode: TextMatch) -> String {
    let mut escaped = String::with_capacity(pattern.len() + 2);
    for c in pattern.chars() {
        match c {
            '*' => escaped.push_str("[*]"),
            '?' => escaped.push_str("[?]"),
            '[' => escaped.push_str("[[]"),
            _ => escaped.push(c),
        }
    }
    match mode {
        TextMatch::Contains => format!("*{}*", escaped),
        TextMatch::StartsWith => format!("{}*", escaped),
        TextMatch::EndsWith => format!("*{}", escaped),
    }
}

impl PredicateBuilder for SqlPredicateBuilder<'_> {
    type Predicate = SqlExpr;

    fn and(&mut self, predicates: Vec<SqlExpr>) -> SqlExpr {
        self.join(predicates, " AND ", ALWAYS_TRUE)
    }

    fn or(&mut self, predicates: Vec<SqlExpr>) -> SqlExpr {
        self.join(predicates, " OR ", ALWAYS_FALSE)
    }

    fn not(&mut self, predicate: SqlExpr) -> SqlExpr {
        SqlExpr(format!("NOT ({})", predicate))
    }

    fn compare(&mut self, path: &ResolvedPath, op: Comparison, value: Value) -> SqlExpr {
        let column = self.column_or_record(path);
        let param = self.bind(to_param(&value));
        if is_temporal(&value) {
            SqlExpr(format!("julianday({}) {} julianday({})", column, op.symbol(), param))
        } else {
            SqlExpr(format!("{} {} {}", column, op.symbol(), param))
        }
    }

    fn text_match(
        &mut self,
        path: &ResolvedPath,
        pattern: &str,
        mode: TextMatch,
        case_sensitive: bool,
    ) -> SqlExpr {
        let column = self.column_or_record(path);
        if case_sensitive {
            let param = self.bind(RawValue::String(glob_pattern(pattern, mode)));
            SqlExpr(format!("{} GLOB {}", column, param))
        } else {
            let param = self.bind(RawValue::String(like_pattern(pattern, mode)));
            SqlExpr(format!("{} LIKE {} ESCAPE '\\'", column, param))
        }
    }

    fn member_of(&mut self, path: &ResolvedPath, values: Vec<Value>) -> SqlExpr {
        let column = self.column_or_record(path);
        let temporal = values.iter().any(is_temporal);
        let params: Vec<String> = values
            .iter()
            .map(|v| {
                let param = self.bind(to_param(v));
                if temporal {
                    format!("julianday({})", param)
                } else {
                    param
                }
            })
            .collect();
        if temporal {
            SqlExpr(format!("julianday({}) IN ({})", column, params.join(", ")))
        } else {
            SqlExpr(format!("{} IN ({})", column, params.join(", ")))
        }
    }

    fn is_null(&mut self, path: &ResolvedPath) -> SqlExpr {
        SqlExpr(format!("{} IS NULL", self.column_or_record(path)))
    }

    fn is_not_null(&mut self, path: &ResolvedPath) -> SqlExpr {
        SqlExpr(format!("{} IS NOT NULL", self.column_or_record(path)))
    }
}

/// Clauses of one rendered SELECT, before assembly
struct Clauses {
    projection: String,
    from: String,
    filter: Option<SqlExpr>,
    group_by: Vec<String>,
    having: Option<SqlExpr>,
    order_by: Vec<String>,
    params: HashMap<String, RawValue>,
}

impl Clauses {
    /// Everything up to and including HAVING
    fn select_sql(&self, distinct: bool) -> String {
        let mut sql = format!(
            "SELECT {}{}\nFROM {}",
            if distinct { "DISTINCT " } else { "" },
            self.projection,
            self.from
        );
        if let Some(filter) = &self.filter {
            sql.push_str(&format!("\nWHERE {}", filter));
        }
        if !self.group_by.is_empty() {
            sql.push_str(&format!("\nGROUP BY {}", self.group_by.join(", ")));
        }
        if let Some(having) = &self.having {
            sql.push_str(&format!("\nHAVING {}", having));
        }
        sql
    }
}

/// SQLite renderer over an explicit entity [`Schema`].
pub struct SqliteRenderer {
    schema: Arc<Schema>,
    compiler: CriteriaCompiler<SqlExpr>,
}

impl SqliteRenderer {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            compiler: CriteriaCompiler::new(schema.clone()),
            schema,
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.compiler = self.compiler.with_options(options);
        self
    }

    /// Replace the operator rules
    pub fn with_registry(mut self, registry: RuleRegistry<SqlExpr>) -> Self {
        self.compiler = self.compiler.with_registry(registry);
        self
    }

    pub fn options(&self) -> &CompileOptions {
        self.compiler.options()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn compile(
        &self,
        criteria: &[Criterion],
        builder: &mut SqlPredicateBuilder<'_>,
    ) -> SqliteResult<Option<SqlExpr>> {
        let compiled = self.compiler.compile(criteria, builder)?;
        builder.check()?;
        Ok(compiled)
    }

    fn projection(
        &self,
        query: &DynamicQuery,
        builder: &mut SqlPredicateBuilder<'_>,
    ) -> SqliteResult<String> {
        let grouped_defaults: Vec<Selection>;
        let selections = if query.select.is_empty() && query.is_grouped() {
            grouped_defaults = query.group_by.iter().map(Selection::new).collect();
            &grouped_defaults
        } else {
            &query.select
        };

        if selections.is_empty() {
            return Ok("t0.*".to_string());
        }

        let mut columns = Vec::with_capacity(selections.len() + 1);
        for selection in selections {
            let column = builder.column(&resolve(&selection.field)?)?;
            columns.push(format!("{} AS {}", column, identifier(selection.output_name())?));
        }
        if query.is_grouped() {
            columns.push("COUNT(*) AS count".to_string());
        }
        Ok(columns.join(", "))
    }

    fn clauses(&self, query: &DynamicQuery) -> SqliteResult<Clauses> {
        query.check_having()?;
        let mut builder = SqlPredicateBuilder::new(&self.schema)?;

        let filter = self.compile(&query.criteria, &mut builder)?;
        let having = self.compile(&query.having, &mut builder)?;
        let projection = self.projection(query, &mut builder)?;

        let group_by = query
            .group_by
            .iter()
            .map(|field| -> SqliteResult<String> { builder.column(&resolve(field)?) })
            .collect::<SqliteResult<Vec<_>>>()?;

        let order_by = query
            .order_by
            .iter()
            .map(|ordering| -> SqliteResult<String> {
                let column = builder.column(&resolve(&ordering.field)?)?;
                Ok(match ordering.direction {
                    Direction::Asc => format!("{} ASC", column),
                    Direction::Desc => format!("{} DESC", column),
                })
            })
            .collect::<SqliteResult<Vec<_>>>()?;

        let from = builder.plan().from_clause();
        Ok(Clauses {
            projection,
            from,
            filter,
            group_by,
            having,
            order_by,
            params: builder.into_params(),
        })
    }
}

impl QueryRenderer for SqliteRenderer {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn render(&self, query: &DynamicQuery) -> SqliteResult<RenderedQuery> {
        self.compiler.options().check_paging(query)?;
        let clauses = self.clauses(query)?;

        let mut sql = clauses.select_sql(query.distinct);
        if !clauses.order_by.is_empty() {
            sql.push_str(&format!("\nORDER BY {}", clauses.order_by.join(", ")));
        }
        if let Some(page) = query.page_request_opt()? {
            sql.push_str(&format!("\nLIMIT {} OFFSET {}", page.size, page.offset()));
        }

        debug!(sql = %sql, params = clauses.params.len(), "Rendered SQLite query");
        Ok(RenderedQuery {
            sql,
            params: clauses.params,
        })
    }

    fn render_count(&self, query: &DynamicQuery) -> SqliteResult<RenderedQuery> {
        let clauses = self.clauses(query)?;

        let sql = if query.distinct || query.is_grouped() || clauses.having.is_some() {
            format!(
                "SELECT COUNT(*) FROM (\n{}\n)",
                clauses.select_sql(query.distinct)
            )
        } else {
            let mut sql = format!("SELECT COUNT(*)\nFROM {}", clauses.from);
            if let Some(filter) = &clauses.filter {
                sql.push_str(&format!("\nWHERE {}", filter));
            }
            sql
        };

        debug!(sql = %sql, params = clauses.params.len(), "Rendered SQLite count");
        Ok(RenderedQuery {
            sql,
            params: clauses.params,
        })
    }
}
