//! In-memory document collection implementing [`QueryExecutor`].
//!
//! Execution runs filter → group/having → order → project → distinct → page
//! over a snapshot taken under a read lock.

use crate::error::{DocStoreError, DocStoreResult};
use crate::path::{compare_json, first_at, project};
use crate::predicate::{DocPredicate, DocPredicateBuilder};
use parking_lot::RwLock;
use serde_json::Value as RawValue;
use sieve_config::SieveConfig;
use sieve_query::{
    resolve, CompileOptions, CriteriaCompiler, Criterion, Direction, DynamicQuery, Page,
    QueryExecutor, ResolvedPath, Row, RuleRegistry, Schema, Selection,
};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, trace};

/// Documents sharing the same group key, represented by the first one seen
struct Group<'d> {
    key: Vec<RawValue>,
    first: &'d RawValue,
    count: u64,
}

/// Thread-safe collection of JSON object documents.
pub struct DocumentStore {
    documents: RwLock<Vec<RawValue>>,
    compiler: CriteriaCompiler<DocPredicate>,
}

impl DocumentStore {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
            compiler: CriteriaCompiler::new(schema),
        }
    }

    /// Empty store with the configured query options
    pub fn from_config(config: &SieveConfig, schema: Arc<Schema>) -> Self {
        Self::new(schema).with_options(CompileOptions::from(&config.query))
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.compiler = self.compiler.with_options(options);
        self
    }

    /// Replace the operator rules
    pub fn with_registry(mut self, registry: RuleRegistry<DocPredicate>) -> Self {
        self.compiler = self.compiler.with_registry(registry);
        self
    }

    pub fn insert(&self, document: RawValue) -> DocStoreResult<()> {
        if !document.is_object() {
            return Err(DocStoreError::InvalidDocument(format!(
                "expected a JSON object, got {}",
                document
            )));
        }
        self.documents.write().push(document);
        Ok(())
    }

    /// Insert every document or none
    pub fn insert_all(
        &self,
        documents: impl IntoIterator<Item = RawValue>,
    ) -> DocStoreResult<usize> {
        let documents: Vec<RawValue> = documents.into_iter().collect();
        if let Some(bad) = documents.iter().find(|d| !d.is_object()) {
            return Err(DocStoreError::InvalidDocument(format!(
                "expected a JSON object, got {}",
                bad
            )));
        }
        let inserted = documents.len();
        self.documents.write().extend(documents);
        Ok(inserted)
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    pub fn clear(&self) {
        self.documents.write().clear();
    }

    /// Compile criteria to a document predicate; `None` matches everything
    pub fn compile(&self, criteria: &[Criterion]) -> DocStoreResult<Option<DocPredicate>> {
        Ok(self.compiler.compile(criteria, &mut DocPredicateBuilder)?)
    }

    fn filter<'d>(
        &self,
        documents: &'d [RawValue],
        criteria: &[Criterion],
    ) -> DocStoreResult<Vec<&'d RawValue>> {
        let predicate = self.compile(criteria)?;
        let deserializer = self.compiler.deserializer();
        Ok(documents
            .iter()
            .filter(|doc| {
                predicate
                    .as_ref()
                    .map_or(true, |p| p.matches(doc, deserializer))
            })
            .collect())
    }

    fn group<'d>(
        &self,
        matched: Vec<&'d RawValue>,
        query: &DynamicQuery,
    ) -> DocStoreResult<Vec<Group<'d>>> {
        let paths = resolve_all(query.group_by.iter())?;
        let mut groups: Vec<Group<'d>> = Vec::new();

        for doc in matched {
            let key: Vec<RawValue> = paths.iter().map(|p| first_at(doc, p).clone()).collect();
            match groups.iter_mut().find(|g| g.key == key) {
                Some(group) => group.count += 1,
                None => groups.push(Group {
                    key,
                    first: doc,
                    count: 1,
                }),
            }
        }

        // check_having keeps HAVING on group keys, which every member shares
        let having = self.compile(&query.having)?;
        let deserializer = self.compiler.deserializer();
        groups.retain(|g| having.as_ref().map_or(true, |p| p.matches(g.first, deserializer)));
        Ok(groups)
    }

    /// All result rows of `query`, before paging
    fn rows(&self, query: &DynamicQuery) -> DocStoreResult<Vec<Row>> {
        query.check_having()?;
        let documents = self.documents.read();
        let matched = self.filter(&documents, &query.criteria)?;
        trace!(matched = matched.len(), total = documents.len(), "Filtered documents");

        let orderings = query
            .order_by
            .iter()
            .map(|o| Ok((resolve(&o.field)?, o.direction)))
            .collect::<DocStoreResult<Vec<_>>>()?;
        let sort = |a: &RawValue, b: &RawValue| compare_by(a, b, &orderings);

        let mut rows = if query.is_grouped() {
            let mut groups = self.group(matched, query)?;
            groups.sort_by(|a, b| sort(a.first, b.first));

            let selections = if query.select.is_empty() {
                query.group_by.iter().map(Selection::new).collect()
            } else {
                query.select.clone()
            };
            let selected = resolve_selections(&selections)?;

            groups
                .into_iter()
                .map(|g| {
                    let mut row = project_row(g.first, &selected);
                    row.insert("count".to_string(), RawValue::from(g.count));
                    row
                })
                .collect::<Vec<_>>()
        } else {
            let mut matched = matched;
            matched.sort_by(|a, b| sort(*a, *b));

            let selected = resolve_selections(&query.select)?;
            matched
                .into_iter()
                .map(|doc| match (&selected[..], doc) {
                    ([], RawValue::Object(map)) => map.clone(),
                    _ => project_row(doc, &selected),
                })
                .collect()
        };

        if query.distinct {
            let mut unique: Vec<Row> = Vec::with_capacity(rows.len());
            for row in rows {
                if !unique.contains(&row) {
                    unique.push(row);
                }
            }
            rows = unique;
        }
        Ok(rows)
    }
}

fn resolve_all<'a>(fields: impl Iterator<Item = &'a String>) -> DocStoreResult<Vec<ResolvedPath>> {
    Ok(fields.map(|f| resolve(f)).collect::<Result<Vec<_>, _>>()?)
}

fn resolve_selections(selections: &[Selection]) -> DocStoreResult<Vec<(String, ResolvedPath)>> {
    selections
        .iter()
        .map(|s| Ok((s.output_name().to_string(), resolve(&s.field)?)))
        .collect()
}

fn project_row(document: &RawValue, selected: &[(String, ResolvedPath)]) -> Row {
    selected
        .iter()
        .map(|(name, path)| (name.clone(), project(document, path)))
        .collect()
}

fn compare_by(a: &RawValue, b: &RawValue, orderings: &[(ResolvedPath, Direction)]) -> Ordering {
    for (path, direction) in orderings {
        let ordering = compare_json(first_at(a, path), first_at(b, path));
        let ordering = match direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

impl QueryExecutor for DocumentStore {
    type Error = DocStoreError;

    fn execute(&self, query: &DynamicQuery) -> DocStoreResult<Vec<Row>> {
        self.compiler.options().check_paging(query)?;
        let rows = self.rows(query)?;

        let rows: Vec<Row> = match query.page_request_opt()? {
            Some(page) => rows
                .into_iter()
                .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
                .take(page.size as usize)
                .collect(),
            None => rows,
        };
        debug!(rows = rows.len(), "Executed document query");
        Ok(rows)
    }

    fn execute_as_page(&self, query: &DynamicQuery) -> DocStoreResult<Page<Row>> {
        let page = query.page_request()?;
        self.compiler.options().check_page_size(page.size)?;

        let rows = self.rows(query)?;
        let total_elements = rows.len() as u64;
        let content = rows
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.size as usize)
            .collect();
        Ok(Page::new(content, page.number, page.size, total_elements))
    }

    fn count(&self, criteria: &[Criterion]) -> DocStoreResult<u64> {
        let documents = self.documents.read();
        Ok(self.filter(&documents, criteria)?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sieve_query::{EntitySchema, FieldType, OperatorKind, QueryBuilder, QueryError};

    fn store() -> DocumentStore {
        let schema = Schema::new(
            EntitySchema::new("course", "courses")
                .field("name", FieldType::Text)
                .field("credits", FieldType::Integer)
                .relation("dept", "department", "dept_id", "id"),
        )
        .with_entity(EntitySchema::new("department", "departments").field("name", FieldType::Text));

        let store = DocumentStore::new(Arc::new(schema));
        store
            .insert_all([
                json!({"name": "Calculus", "credits": 5, "dept": {"name": "Mathematics"}}),
                json!({"name": "Algebra", "credits": 5, "dept": {"name": "Mathematics"}}),
                json!({"name": "Optics", "credits": 3, "dept": {"name": "Physics"}}),
            ])
            .unwrap();
        store
    }

    #[test]
    fn test_insert_rejects_non_objects() {
        let store = store();
        assert!(matches!(
            store.insert(json!([1, 2])),
            Err(DocStoreError::InvalidDocument(_))
        ));
        assert!(store.insert_all([json!({"name": "Logic"}), json!(3)]).is_err());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_unfiltered_returns_whole_documents() {
        let rows = store().execute(&DynamicQuery::default()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2]["dept"], json!({"name": "Physics"}));
    }

    #[test]
    fn test_distinct_projection() {
        let query = QueryBuilder::detached()
            .select_as("dept.name", "department")
            .distinct()
            .order_by("dept.name", Direction::Desc)
            .build();

        let rows = store().execute(&query).unwrap();

        assert_eq!(
            RawValue::Array(rows.into_iter().map(RawValue::Object).collect()),
            json!([{"department": "Physics"}, {"department": "Mathematics"}])
        );
    }

    #[test]
    fn test_group_with_having() {
        let query = QueryBuilder::detached()
            .group_by("dept.name")
            .having(Criterion::single("dept.name", OperatorKind::StartWith, "Math"))
            .build();

        let rows = store().execute(&query).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(RawValue::Object(rows[0].clone()), json!({"name": "Mathematics", "count": 2}));
    }

    #[test]
    fn test_page_window_and_total() {
        let query = QueryBuilder::detached()
            .order_by("name", Direction::Asc)
            .page(1, 2)
            .build();

        let page = store().execute_as_page(&query).unwrap();

        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0]["name"], json!("Optics"));
        assert_eq!(page.total_elements, 3);
    }

    #[test]
    fn test_compile_errors_are_query_errors() {
        let query = DynamicQuery::with_criteria(vec![Criterion::open()]);
        assert!(matches!(
            store().execute(&query),
            Err(DocStoreError::Query(QueryError::UnbalancedParentheses { position: 0 }))
        ));
    }
}
