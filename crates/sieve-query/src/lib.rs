//! # Sieve Query
//!
//! Backend-agnostic criteria model and predicate compiler.
//!
//! A [`DynamicQuery`] carries a flat, ordered list of [`Criterion`] whose
//! grouping is expressed in-band by `OR` / `OPEN_PARENTHESES` /
//! `CLOSE_PARENTHESES` sentinels. [`CriteriaCompiler`] resolves each key path,
//! coerces raw values to the field's declared type, dispatches to an
//! [`OperatorRule`] and reduces the sequence into one predicate of whatever
//! type the backend's [`PredicateBuilder`] produces.
//!
//! Storage engines implement [`QueryExecutor`]; [`QueryBuilder`] assembles
//! envelopes fluently and in a fixed clause order.
//!
//! ```rust
//! use sieve_query::{Criterion, OperatorKind, QueryBuilder};
//!
//! let query = QueryBuilder::detached()
//!     .select("name")
//!     .filter(Criterion::single("name", OperatorKind::Contain, "Calc"))
//!     .or()
//!     .filter(Criterion::single("name", OperatorKind::Contain, "Alg"))
//!     .page(0, 20)
//!     .build();
//!
//! assert_eq!(query.criteria.len(), 3);
//! ```

pub mod builder;
pub mod compile;
pub mod criteria;
pub mod error;
pub mod executor;
pub mod key_path;
pub mod predicate;
pub mod reduce;
pub mod rules;
pub mod schema;
pub mod value;

#[cfg(test)]
mod testing;

pub use builder::QueryBuilder;
pub use compile::{CompileOptions, CriteriaCompiler};
pub use criteria::{
    criteria_from_triples, Criterion, Direction, DynamicQuery, OperatorKind, Ordering,
    PageRequest, Selection,
};
pub use error::{QueryError, QueryResult};
pub use executor::{consume_partially, project_row, project_rows, Page, QueryExecutor, Row};
pub use key_path::{resolve, Join, JoinKind, ResolvedPath};
pub use predicate::{Comparison, PredicateBuilder, TextMatch};
pub use rules::{OperatorRule, RuleContext, RuleRegistry};
pub use schema::{EntitySchema, FieldTypeLookup, Relation, Schema};
pub use value::{FieldType, StandardDeserializer, Value, ValueDeserializer};
