//! In-memory JSON document backend for Sieve.
//!
//! Compiles criteria into [`DocPredicate`] trees and evaluates them directly
//! against stored documents. Relations are nested objects or arrays of
//! objects; a key path such as `teacher.name` walks them hop by hop.
//!
//! ```
//! use serde_json::json;
//! use sieve_docstore::DocumentStore;
//! use sieve_query::{Criterion, EntitySchema, FieldType, OperatorKind, QueryBuilder, Schema};
//! use std::sync::Arc;
//!
//! let schema = Schema::new(EntitySchema::new("course", "courses").field("name", FieldType::Text));
//! let store = DocumentStore::new(Arc::new(schema));
//! store.insert(json!({"name": "Calculus"})).unwrap();
//! store.insert(json!({"name": "Algebra"})).unwrap();
//!
//! let rows = QueryBuilder::new(&store)
//!     .filter(Criterion::single("name", OperatorKind::Contain, "Calc"))
//!     .fetch()
//!     .unwrap();
//! assert_eq!(rows.len(), 1);
//! ```

pub mod error;
pub mod path;
pub mod predicate;
pub mod store;

pub use error::{DocStoreError, DocStoreResult};
pub use predicate::{DocPredicate, DocPredicateBuilder};
pub use store::DocumentStore;
