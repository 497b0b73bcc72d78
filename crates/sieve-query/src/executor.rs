//! Backend executor contract and result paging.

use crate::criteria::{Criterion, DynamicQuery};
use crate::error::{QueryError, QueryResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as RawValue};
use tracing::debug;

/// One result row: column or document field name → value
pub type Row = Map<String, RawValue>;

/// Executes a [`DynamicQuery`] against one storage engine.
///
/// Adapters read the envelope and never mutate it. Their errors must be able
/// to carry a [`QueryError`], because compilation happens inside `execute`.
pub trait QueryExecutor {
    type Error: From<QueryError>;

    fn execute(&self, query: &DynamicQuery) -> Result<Vec<Row>, Self::Error>;

    /// Rows of the requested page plus the total row count.
    ///
    /// The default runs `execute` and then `count` over the same criteria,
    /// which is only right for ungrouped, non-distinct queries; adapters that
    /// support grouping override it.
    fn execute_as_page(&self, query: &DynamicQuery) -> Result<Page<Row>, Self::Error> {
        let page = query.page_request()?;
        let content = self.execute(query)?;
        let total_elements = self.count(&query.criteria)?;
        Ok(Page::new(content, page.number, page.size, total_elements))
    }

    fn count(&self, criteria: &[Criterion]) -> Result<u64, Self::Error>;
}

/// A slice of a larger result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page_number: u32,
    pub page_size: u32,
    pub total_elements: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, page_number: u32, page_size: u32, total_elements: u64) -> Self {
        Self {
            content,
            page_number,
            page_size,
            total_elements,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_elements.div_ceil(u64::from(self.page_size))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page_number) + 1 < self.total_pages()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_elements: self.total_elements,
        }
    }

    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            content: self.content.into_iter().map(f).collect::<Result<_, _>>()?,
            page_number: self.page_number,
            page_size: self.page_size,
            total_elements: self.total_elements,
        })
    }
}

/// Deserialize a row into a projection type
pub fn project_row<T: DeserializeOwned>(row: Row) -> QueryResult<T> {
    Ok(serde_json::from_value(RawValue::Object(row))?)
}

pub fn project_rows<T: DeserializeOwned>(rows: Vec<Row>) -> QueryResult<Vec<T>> {
    rows.into_iter().map(project_row).collect()
}

/// Walk the whole result of `query` page by page.
///
/// Page indexes start at 0 and strictly increase, the page size never
/// changes, and iteration stops at the first page shorter than `page_size`.
/// Rows inserted or deleted between page fetches may be skipped or seen
/// twice; no snapshot is taken. Any paging already set on `query` is
/// replaced. Returns the number of rows handed to `consumer`.
pub fn consume_partially<X, F>(
    executor: &X,
    query: &DynamicQuery,
    page_size: u32,
    mut consumer: F,
) -> Result<u64, X::Error>
where
    X: QueryExecutor + ?Sized,
    F: FnMut(Vec<Row>) -> Result<(), X::Error>,
{
    if page_size == 0 {
        return Err(QueryError::InvalidPageSize {
            size: 0,
            max: u32::MAX,
        }
        .into());
    }

    let mut paged = query.clone();
    paged.page_size = Some(page_size);

    let mut consumed = 0u64;
    for page_number in 0u32.. {
        paged.page_number = Some(page_number);
        let batch = executor.execute(&paged)?;
        let len = batch.len();
        debug!(page_number, page_size, rows = len, "Consumed batch");

        consumed += len as u64;
        if len > 0 {
            consumer(batch)?;
        }
        if len < page_size as usize {
            break;
        }
    }
    Ok(consumed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    /// Serves `total` numbered rows and records every page it was asked for
    struct NumberedRows {
        total: u64,
        requests: RefCell<Vec<(u32, u32)>>,
    }

    impl NumberedRows {
        fn new(total: u64) -> Self {
            Self {
                total,
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl QueryExecutor for NumberedRows {
        type Error = QueryError;

        fn execute(&self, query: &DynamicQuery) -> Result<Vec<Row>, QueryError> {
            let page = query.page_request()?;
            self.requests.borrow_mut().push((page.number, page.size));
            let start = page.offset();
            let end = (start + u64::from(page.size)).min(self.total);
            Ok((start..end)
                .map(|n| {
                    let mut row = Row::new();
                    row.insert("n".to_string(), json!(n));
                    row
                })
                .collect())
        }

        fn count(&self, _criteria: &[Criterion]) -> Result<u64, QueryError> {
            Ok(self.total)
        }
    }

    #[test]
    fn test_consume_stops_at_short_page() {
        let executor = NumberedRows::new(25);
        let mut seen = Vec::new();

        let consumed = consume_partially(&executor, &DynamicQuery::default(), 10, |batch| {
            seen.extend(batch.into_iter().map(|row| row["n"].as_u64().unwrap()));
            Ok(())
        })
        .unwrap();

        assert_eq!(consumed, 25);
        assert_eq!(seen, (0..25).collect::<Vec<_>>());
        assert_eq!(*executor.requests.borrow(), vec![(0, 10), (1, 10), (2, 10)]);
    }

    #[test]
    fn test_consume_exact_multiple_fetches_one_empty_page() {
        let executor = NumberedRows::new(20);
        let mut batches = 0;

        let consumed = consume_partially(&executor, &DynamicQuery::default(), 10, |_| {
            batches += 1;
            Ok(())
        })
        .unwrap();

        assert_eq!(consumed, 20);
        assert_eq!(batches, 2);
        assert_eq!(executor.requests.borrow().len(), 3);
    }

    #[test]
    fn test_consume_rejects_zero_page_size() {
        let executor = NumberedRows::new(5);
        let result = consume_partially(&executor, &DynamicQuery::default(), 0, |_| Ok(()));
        assert!(matches!(result, Err(QueryError::InvalidPageSize { size: 0, .. })));
        assert!(executor.requests.borrow().is_empty());
    }

    #[test]
    fn test_consumer_error_stops_iteration() {
        let executor = NumberedRows::new(100);
        let result = consume_partially(&executor, &DynamicQuery::default(), 10, |_| {
            Err(QueryError::MissingPageParameters)
        });
        assert!(result.is_err());
        assert_eq!(executor.requests.borrow().len(), 1);
    }

    #[test]
    fn test_default_execute_as_page() {
        let executor = NumberedRows::new(25);
        let query = DynamicQuery {
            page_number: Some(2),
            page_size: Some(10),
            ..Default::default()
        };

        let page = executor.execute_as_page(&query).unwrap();

        assert_eq!(page.content.len(), 5);
        assert_eq!(page.total_elements, 25);
        assert_eq!(page.total_pages(), 3);
        assert!(!page.has_next());
    }

    #[test]
    fn test_page_math() {
        let page = Page::new(vec![1, 2], 0, 2, 5);
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());

        let doubled = page.map(|n| n * 2);
        assert_eq!(doubled.content, vec![2, 4]);
    }

    #[test]
    fn test_project_rows() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Named {
            name: String,
        }

        let mut row = Row::new();
        row.insert("name".to_string(), json!("Calculus"));
        row.insert("ignored".to_string(), json!(1));

        let projected: Vec<Named> = project_rows(vec![row]).unwrap();
        assert_eq!(projected, vec![Named { name: "Calculus".to_string() }]);

        let mut bad = Row::new();
        bad.insert("name".to_string(), json!(3));
        assert!(matches!(project_row::<Named>(bad), Err(QueryError::Projection(_))));
    }
}
