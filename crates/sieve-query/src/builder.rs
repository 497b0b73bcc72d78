//! Staged fluent query builder.
//!
//! Clause order is enforced by the type system:
//!
//! ```text
//! select* → distinct? → filter* → (group_by* having*)? → order_by* → page? → terminal
//! ```
//!
//! Every method consumes the builder and returns it in the stage it entered.
//! A stage can be re-entered (several `filter` calls append) until a later
//! stage begins; going back, e.g. `select` after `order_by`, does not compile.
//!
//! ```compile_fail
//! use sieve_query::{Direction, QueryBuilder};
//! let _ = QueryBuilder::detached().order_by("name", Direction::Asc).select("name");
//! ```
//!
//! No I/O happens until a terminal method (`fetch*`, `count`) runs.

use crate::criteria::{Criterion, Direction, DynamicQuery, OperatorKind, Ordering, Selection};
use crate::executor::{project_rows, Page, QueryExecutor, Row};
use serde::de::DeserializeOwned;
use serde_json::Value as RawValue;
use std::marker::PhantomData;

/// Builder stage markers
pub mod stage {
    /// Nothing added yet
    pub struct Initial;
    /// After `select`
    pub struct Select;
    /// After `distinct`
    pub struct Distinct;
    /// After `filter`
    pub struct Where;
    /// After `group_by` / `having`
    pub struct GroupBy;
    /// After `order_by`
    pub struct OrderBy;
    /// After `page`
    pub struct Page;
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::stage::Initial {}
    impl Sealed for super::stage::Select {}
    impl Sealed for super::stage::Distinct {}
    impl Sealed for super::stage::Where {}
    impl Sealed for super::stage::GroupBy {}
    impl Sealed for super::stage::OrderBy {}
    impl Sealed for super::stage::Page {}
}

/// Stages from which `select` is reachable
pub trait CanSelect: sealed::Sealed {}
/// Stages from which `distinct` is reachable
pub trait CanDistinct: sealed::Sealed {}
/// Stages from which `filter` is reachable
pub trait CanFilter: sealed::Sealed {}
/// Stages from which `group_by` is reachable
pub trait CanGroup: sealed::Sealed {}
/// Stages from which `order_by` is reachable
pub trait CanOrder: sealed::Sealed {}
/// Stages from which `page` is reachable
pub trait CanPage: sealed::Sealed {}

macro_rules! allow {
    ($capability:ident: $($stage:ident),+) => {
        $(impl $capability for stage::$stage {})+
    };
}

allow!(CanSelect: Initial, Select);
allow!(CanDistinct: Initial, Select);
allow!(CanFilter: Initial, Select, Distinct, Where);
allow!(CanGroup: Initial, Select, Distinct, Where, GroupBy);
allow!(CanOrder: Initial, Select, Distinct, Where, GroupBy, OrderBy);
allow!(CanPage: Initial, Select, Distinct, Where, GroupBy, OrderBy);

/// Fluent construction of a [`DynamicQuery`] bound to an executor.
pub struct QueryBuilder<'e, E: ?Sized, S = stage::Initial> {
    executor: &'e E,
    query: DynamicQuery,
    stage: PhantomData<S>,
}

impl QueryBuilder<'static, (), stage::Initial> {
    /// Builder with no executor; only [`build`](QueryBuilder::build) is available.
    pub fn detached() -> Self {
        Self {
            executor: &(),
            query: DynamicQuery::default(),
            stage: PhantomData,
        }
    }
}

impl<'e, E: ?Sized> QueryBuilder<'e, E, stage::Initial> {
    pub fn new(executor: &'e E) -> Self {
        Self {
            executor,
            query: DynamicQuery::default(),
            stage: PhantomData,
        }
    }
}

impl<'e, E: ?Sized, S> QueryBuilder<'e, E, S> {
    fn advance<T>(self) -> QueryBuilder<'e, E, T> {
        QueryBuilder {
            executor: self.executor,
            query: self.query,
            stage: PhantomData,
        }
    }

    fn push_criterion(mut self, criterion: Criterion) -> QueryBuilder<'e, E, stage::Where> {
        self.query.criteria.push(criterion);
        self.advance()
    }

    /// The envelope assembled so far
    pub fn query(&self) -> &DynamicQuery {
        &self.query
    }

    /// Finish without executing
    pub fn build(self) -> DynamicQuery {
        self.query
    }
}

impl<'e, E: ?Sized, S: CanSelect> QueryBuilder<'e, E, S> {
    pub fn select(mut self, field: impl Into<String>) -> QueryBuilder<'e, E, stage::Select> {
        self.query.select.push(Selection::new(field));
        self.advance()
    }

    pub fn select_as(
        mut self,
        field: impl Into<String>,
        alias: impl Into<String>,
    ) -> QueryBuilder<'e, E, stage::Select> {
        self.query.select.push(Selection::aliased(field, alias));
        self.advance()
    }
}

impl<'e, E: ?Sized, S: CanDistinct> QueryBuilder<'e, E, S> {
    pub fn distinct(mut self) -> QueryBuilder<'e, E, stage::Distinct> {
        self.query.distinct = true;
        self.advance()
    }
}

impl<'e, E: ?Sized, S: CanFilter> QueryBuilder<'e, E, S> {
    /// Append a criterion; adjacent criteria are ANDed
    pub fn filter(self, criterion: Criterion) -> QueryBuilder<'e, E, stage::Where> {
        self.push_criterion(criterion)
    }

    /// Shorthand for `filter(Criterion::new(key, operator, values))`
    pub fn filter_by<V>(
        self,
        key: impl Into<String>,
        operator: OperatorKind,
        values: V,
    ) -> QueryBuilder<'e, E, stage::Where>
    where
        V: IntoIterator,
        V::Item: Into<RawValue>,
    {
        self.push_criterion(Criterion::new(key, operator, values))
    }

    /// Append criteria in order, sentinels included
    pub fn filter_all(
        mut self,
        criteria: impl IntoIterator<Item = Criterion>,
    ) -> QueryBuilder<'e, E, stage::Where> {
        self.query.criteria.extend(criteria);
        self.advance()
    }

    /// Open a parenthesized group
    pub fn open_group(self) -> QueryBuilder<'e, E, stage::Where> {
        self.push_criterion(Criterion::open())
    }
}

impl<'e, E: ?Sized> QueryBuilder<'e, E, stage::Where> {
    /// OR what follows with what precedes, at the current nesting level
    pub fn or(self) -> Self {
        self.push_criterion(Criterion::or())
    }

    pub fn close_group(self) -> Self {
        self.push_criterion(Criterion::close())
    }
}

impl<'e, E: ?Sized, S: CanGroup> QueryBuilder<'e, E, S> {
    pub fn group_by(mut self, field: impl Into<String>) -> QueryBuilder<'e, E, stage::GroupBy> {
        self.query.group_by.push(field.into());
        self.advance()
    }
}

impl<'e, E: ?Sized> QueryBuilder<'e, E, stage::GroupBy> {
    /// Filter applied to grouped rows
    pub fn having(mut self, criterion: Criterion) -> Self {
        self.query.having.push(criterion);
        self
    }
}

impl<'e, E: ?Sized, S: CanOrder> QueryBuilder<'e, E, S> {
    pub fn order_by(
        mut self,
        field: impl Into<String>,
        direction: Direction,
    ) -> QueryBuilder<'e, E, stage::OrderBy> {
        self.query.order_by.push(Ordering::new(field, direction));
        self.advance()
    }
}

impl<'e, E: ?Sized, S: CanPage> QueryBuilder<'e, E, S> {
    /// Zero-based page number and page size
    pub fn page(mut self, number: u32, size: u32) -> QueryBuilder<'e, E, stage::Page> {
        self.query.page_number = Some(number);
        self.query.page_size = Some(size);
        self.advance()
    }
}

impl<'e, E, S> QueryBuilder<'e, E, S>
where
    E: QueryExecutor + ?Sized,
{
    /// Entity rows
    pub fn fetch(self) -> Result<Vec<Row>, E::Error> {
        self.executor.execute(&self.query)
    }

    /// Rows deserialized into a projection type
    pub fn fetch_as<T: DeserializeOwned>(self) -> Result<Vec<T>, E::Error> {
        let rows = self.executor.execute(&self.query)?;
        Ok(project_rows(rows)?)
    }

    /// One page of entity rows; requires `page`
    pub fn fetch_page(self) -> Result<Page<Row>, E::Error> {
        self.query.page_request()?;
        self.executor.execute_as_page(&self.query)
    }

    /// One page deserialized into a projection type; requires `page`
    pub fn fetch_page_as<T: DeserializeOwned>(self) -> Result<Page<T>, E::Error> {
        let page = self.fetch_page()?;
        Ok(page.try_map(crate::executor::project_row)?)
    }

    /// Number of rows matching the filters
    pub fn count(self) -> Result<u64, E::Error> {
        self.executor.count(&self.query.criteria)
    }
}

impl From<QueryBuilder<'_, (), stage::Initial>> for DynamicQuery {
    fn from(builder: QueryBuilder<'_, (), stage::Initial>) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use serde_json::json;
    use std::cell::RefCell;

    /// Records the envelopes it receives and returns canned rows
    struct Recording {
        rows: Vec<Row>,
        seen: RefCell<Vec<DynamicQuery>>,
    }

    impl Recording {
        fn new(names: &[&str]) -> Self {
            let rows = names
                .iter()
                .map(|name| {
                    let mut row = Row::new();
                    row.insert("name".to_string(), json!(name));
                    row
                })
                .collect();
            Self {
                rows,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl QueryExecutor for Recording {
        type Error = QueryError;

        fn execute(&self, query: &DynamicQuery) -> Result<Vec<Row>, QueryError> {
            self.seen.borrow_mut().push(query.clone());
            Ok(self.rows.clone())
        }

        fn count(&self, _criteria: &[Criterion]) -> Result<u64, QueryError> {
            Ok(self.rows.len() as u64)
        }
    }

    #[test]
    fn test_builder_matches_direct_construction() {
        let built = QueryBuilder::detached()
            .select("name")
            .select_as("dept.name", "department")
            .distinct()
            .filter_by("age", OperatorKind::GreaterThan, ["30"])
            .or()
            .open_group()
            .filter_by("name", OperatorKind::StartWith, ["A"])
            .filter_by("active", OperatorKind::Equal, ["true"])
            .close_group()
            .group_by("name")
            .group_by("dept.name")
            .having(Criterion::single("name", OperatorKind::Specified, "true"))
            .order_by("name", Direction::Asc)
            .page(2, 25)
            .build();

        let direct = DynamicQuery {
            distinct: true,
            page_number: Some(2),
            page_size: Some(25),
            select: vec![
                Selection::new("name"),
                Selection::aliased("dept.name", "department"),
            ],
            criteria: vec![
                Criterion::single("age", OperatorKind::GreaterThan, "30"),
                Criterion::or(),
                Criterion::open(),
                Criterion::single("name", OperatorKind::StartWith, "A"),
                Criterion::single("active", OperatorKind::Equal, "true"),
                Criterion::close(),
            ],
            order_by: vec![Ordering::new("name", Direction::Asc)],
            group_by: vec!["name".to_string(), "dept.name".to_string()],
            having: vec![Criterion::single("name", OperatorKind::Specified, "true")],
        };

        assert_eq!(built, direct);
    }

    #[test]
    fn test_stages_can_be_skipped() {
        let query: DynamicQuery = QueryBuilder::detached().into();
        assert_eq!(query, DynamicQuery::default());

        let query = QueryBuilder::detached().page(0, 10).build();
        assert_eq!(query.page_size, Some(10));

        let query = QueryBuilder::detached()
            .order_by("name", Direction::Desc)
            .order_by("age", Direction::Asc)
            .build();
        assert_eq!(query.order_by.len(), 2);
    }

    #[test]
    fn test_fetch_dispatches_built_query() {
        let executor = Recording::new(&["Calculus"]);

        let rows = QueryBuilder::new(&executor)
            .filter(Criterion::single("name", OperatorKind::Contain, "Calc"))
            .fetch()
            .unwrap();

        assert_eq!(rows.len(), 1);
        let seen = executor.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].criteria[0].key, "name");
    }

    #[test]
    fn test_no_io_before_terminal() {
        let executor = Recording::new(&[]);
        let builder = QueryBuilder::new(&executor)
            .select("name")
            .filter_by("name", OperatorKind::Equal, ["x"])
            .order_by("name", Direction::Asc);
        assert!(executor.seen.borrow().is_empty());
        drop(builder);
    }

    #[test]
    fn test_fetch_as_projection() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Title {
            name: String,
        }

        let executor = Recording::new(&["Calculus", "Algebra"]);
        let titles: Vec<Title> = QueryBuilder::new(&executor).fetch_as().unwrap();

        assert_eq!(
            titles,
            vec![
                Title { name: "Calculus".to_string() },
                Title { name: "Algebra".to_string() },
            ]
        );
    }

    #[test]
    fn test_fetch_page_requires_page_parameters() {
        let executor = Recording::new(&["a"]);
        let result = QueryBuilder::new(&executor)
            .order_by("name", Direction::Asc)
            .fetch_page();

        assert!(matches!(result, Err(QueryError::MissingPageParameters)));
        assert!(executor.seen.borrow().is_empty());
    }

    #[test]
    fn test_fetch_page_as() {
        #[derive(Debug, serde::Deserialize)]
        struct Title {
            name: String,
        }

        let executor = Recording::new(&["a", "b"]);
        let page: Page<Title> = QueryBuilder::new(&executor).page(0, 2).fetch_page_as().unwrap();

        assert_eq!(page.total_elements, 2);
        assert_eq!(page.content[1].name, "b");
    }

    #[test]
    fn test_count() {
        let executor = Recording::new(&["a", "b", "c"]);
        assert_eq!(QueryBuilder::new(&executor).count().unwrap(), 3);
    }
}
