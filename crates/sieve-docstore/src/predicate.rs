//! Predicate trees evaluated directly against JSON documents.

use crate::path::values_at;
use serde_json::Value as RawValue;
use sieve_query::{
    Comparison, FieldType, PredicateBuilder, ResolvedPath, TextMatch, Value, ValueDeserializer,
};

#[derive(Debug, Clone, PartialEq)]
pub enum DocPredicate {
    /// Empty is always-true
    And(Vec<DocPredicate>),
    /// Empty is always-false
    Or(Vec<DocPredicate>),
    Not(Box<DocPredicate>),
    Compare {
        path: ResolvedPath,
        op: Comparison,
        value: Value,
    },
    Text {
        path: ResolvedPath,
        pattern: String,
        mode: TextMatch,
        case_sensitive: bool,
    },
    Member {
        path: ResolvedPath,
        values: Vec<Value>,
    },
    IsNull(ResolvedPath),
    IsNotNull(ResolvedPath),
}

/// Coercion target for a comparison value; enum names compare as text
fn target_of(value: &Value) -> (FieldType, Value) {
    match value {
        Value::Text(_) | Value::Null => (FieldType::Text, value.clone()),
        Value::Enum(name) => (FieldType::Text, Value::Text(name.clone())),
        Value::Integer(_) => (FieldType::Integer, value.clone()),
        Value::Float(_) => (FieldType::Float, value.clone()),
        Value::Boolean(_) => (FieldType::Boolean, value.clone()),
        Value::Date(_) => (FieldType::Date, value.clone()),
        Value::DateTime(_) => (FieldType::DateTime, value.clone()),
        Value::Uuid(_) => (FieldType::Uuid, value.clone()),
    }
}

impl DocPredicate {
    /// Whether `document` satisfies the predicate.
    ///
    /// A leaf holds when any value its path reaches satisfies it. Document
    /// values that cannot be coerced to the comparison value's type never
    /// match.
    pub fn matches(&self, document: &RawValue, deserializer: &dyn ValueDeserializer) -> bool {
        match self {
            Self::And(items) => items.iter().all(|p| p.matches(document, deserializer)),
            Self::Or(items) => items.iter().any(|p| p.matches(document, deserializer)),
            Self::Not(inner) => !inner.matches(document, deserializer),
            Self::Compare { path, op, value } => {
                let (target, value) = target_of(value);
                present(document, path).any(|raw| {
                    deserializer
                        .deserialize(&path.to_string(), raw, &target)
                        .ok()
                        .and_then(|found| found.compare(&value))
                        .is_some_and(|ordering| op.holds(ordering))
                })
            }
            Self::Text {
                path,
                pattern,
                mode,
                case_sensitive,
            } => present(document, path)
                .filter_map(RawValue::as_str)
                .any(|text| mode.matches(text, pattern, *case_sensitive)),
            Self::Member { path, values } => values.iter().any(|member| {
                Self::Compare {
                    path: path.clone(),
                    op: Comparison::Eq,
                    value: member.clone(),
                }
                .matches(document, deserializer)
            }),
            Self::IsNull(path) => present(document, path).next().is_none(),
            Self::IsNotNull(path) => present(document, path).next().is_some(),
        }
    }
}

/// Non-null values at `path`
fn present<'d>(document: &'d RawValue, path: &ResolvedPath) -> impl Iterator<Item = &'d RawValue> {
    values_at(document, path).into_iter().filter(|v| !v.is_null())
}

/// [`PredicateBuilder`] producing [`DocPredicate`] trees
#[derive(Debug, Default, Clone, Copy)]
pub struct DocPredicateBuilder;

impl PredicateBuilder for DocPredicateBuilder {
    type Predicate = DocPredicate;

    fn and(&mut self, predicates: Vec<DocPredicate>) -> DocPredicate {
        DocPredicate::And(predicates)
    }

    fn or(&mut self, predicates: Vec<DocPredicate>) -> DocPredicate {
        DocPredicate::Or(predicates)
    }

    fn not(&mut self, predicate: DocPredicate) -> DocPredicate {
        DocPredicate::Not(Box::new(predicate))
    }

    fn compare(&mut self, path: &ResolvedPath, op: Comparison, value: Value) -> DocPredicate {
        DocPredicate::Compare {
            path: path.clone(),
            op,
            value,
        }
    }

    fn text_match(
        &mut self,
        path: &ResolvedPath,
        pattern: &str,
        mode: TextMatch,
        case_sensitive: bool,
    ) -> DocPredicate {
        DocPredicate::Text {
            path: path.clone(),
            pattern: pattern.to_string(),
            mode,
            case_sensitive,
        }
    }

    fn member_of(&mut self, path: &ResolvedPath, values: Vec<Value>) -> DocPredicate {
        DocPredicate::Member {
            path: path.clone(),
            values,
        }
    }

    fn is_null(&mut self, path: &ResolvedPath) -> DocPredicate {
        DocPredicate::IsNull(path.clone())
    }

    fn is_not_null(&mut self, path: &ResolvedPath) -> DocPredicate {
        DocPredicate::IsNotNull(path.clone())
    }
}
