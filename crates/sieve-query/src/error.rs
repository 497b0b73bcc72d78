//! Error types for query construction and compilation.
//!
//! Every variant is raised synchronously while a query is being built or
//! compiled. Backend execution errors never pass through this type; adapters
//! wrap it next to their native error instead.

use crate::criteria::OperatorKind;
use thiserror::Error;

/// Query construction/compilation error
#[derive(Error, Debug)]
pub enum QueryError {
    /// Key path has an empty segment or an empty terminal field
    #[error("Malformed key path '{key}': {reason}")]
    MalformedKeyPath { key: String, reason: String },

    /// Raw value cannot be converted to the field's declared type
    #[error("Cannot coerce value {raw} of '{key}' to {target}")]
    ValueCoercion {
        key: String,
        raw: String,
        target: String,
    },

    /// Operator requires at least one value
    #[error("Operator {operator} on '{key}' requires at least one value")]
    NoAvailableValue { key: String, operator: OperatorKind },

    /// Value is well-typed but not acceptable for the operator
    #[error("Illegal value {value} for operator {operator} on '{key}'")]
    IllegalValue {
        key: String,
        operator: OperatorKind,
        value: String,
    },

    /// Operator cannot be applied to the field's declared type
    #[error("Operator {operator} on '{key}' requires a {expected} field, found {found}")]
    TypeMismatch {
        key: String,
        operator: OperatorKind,
        expected: String,
        found: String,
    },

    /// CLOSE_PARENTHESES without an OPEN, or a group left open
    #[error("Unbalanced parentheses at criterion #{position}")]
    UnbalancedParentheses { position: usize },

    /// OR with nothing to combine on one side
    #[error("Misplaced OR at criterion #{position}")]
    MisplacedOr { position: usize },

    /// `()` with no criteria inside
    #[error("Empty parenthesized group at criterion #{position}")]
    EmptyGroup { position: usize },

    /// Paged result requested without page number and size
    #[error("Paged result requires both page number and page size")]
    MissingPageParameters,

    /// Page size is zero or above the configured maximum
    #[error("Invalid page size {size} (maximum {max})")]
    InvalidPageSize { size: u32, max: u32 },

    /// No rule is registered for the operator on the active backend
    #[error("Operator {operator} on '{key}' is not supported by this backend")]
    UnsupportedOperator { key: String, operator: OperatorKind },

    /// Operator name from a wire binding is not recognized
    #[error("Unknown operator '{name}'")]
    UnknownOperator { name: String },

    /// HAVING criterion on a key that is not one of the GROUP BY keys
    #[error("HAVING on '{key}' requires '{key}' to be a GROUP BY key")]
    HavingOutsideGroup { key: String },

    /// Key path names a field or relation the schema does not know
    #[error("Unknown field '{segment}' in key '{key}'")]
    UnknownField { key: String, segment: String },

    /// Result rows could not be deserialized into the projection type
    #[error("Projection failed: {0}")]
    Projection(#[from] serde_json::Error),
}

/// Result type for query construction/compilation
pub type QueryResult<T> = Result<T, QueryError>;
