//! Backend-free predicate builder for tests.
//!
//! [`ExprBuilder`] produces an [`Expr`] tree whose `Display` form reads like
//! a WHERE clause, so tests can assert on compiled criteria without a real
//! storage engine.

use crate::key_path::ResolvedPath;
use crate::predicate::{Comparison, PredicateBuilder, TextMatch};
use crate::value::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Compare(String, Comparison, Value),
    Text(String, TextMatch, String),
    Member(String, Vec<Value>),
    IsNull(String),
    IsNotNull(String),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::And(items) if items.is_empty() => f.write_str("TRUE"),
            Expr::Or(items) if items.is_empty() => f.write_str("FALSE"),
            Expr::And(items) => write_joined(f, items, " AND "),
            Expr::Or(items) => write_joined(f, items, " OR "),
            Expr::Not(inner) => write!(f, "NOT {}", inner),
            Expr::Compare(path, op, value) => write!(f, "{} {} {}", path, op, value),
            Expr::Text(path, mode, pattern) => match mode {
                TextMatch::Contains => write!(f, "{} ~ *{}*", path, pattern),
                TextMatch::StartsWith => write!(f, "{} ~ {}*", path, pattern),
                TextMatch::EndsWith => write!(f, "{} ~ *{}", path, pattern),
            },
            Expr::Member(path, values) => {
                let values: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{} IN [{}]", path, values.join(", "))
            }
            Expr::IsNull(path) => write!(f, "{} IS NULL", path),
            Expr::IsNotNull(path) => write!(f, "{} IS NOT NULL", path),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Expr], separator: &str) -> fmt::Result {
    let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
    write!(f, "({})", parts.join(separator))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ExprBuilder;

impl PredicateBuilder for ExprBuilder {
    type Predicate = Expr;

    fn and(&mut self, predicates: Vec<Expr>) -> Expr {
        Expr::And(predicates)
    }

    fn or(&mut self, predicates: Vec<Expr>) -> Expr {
        Expr::Or(predicates)
    }

    fn not(&mut self, predicate: Expr) -> Expr {
        Expr::Not(Box::new(predicate))
    }

    fn compare(&mut self, path: &ResolvedPath, op: Comparison, value: Value) -> Expr {
        Expr::Compare(path.to_string(), op, value)
    }

    fn text_match(
        &mut self,
        path: &ResolvedPath,
        pattern: &str,
        mode: TextMatch,
        _case_sensitive: bool,
    ) -> Expr {
        Expr::Text(path.to_string(), mode, pattern.to_string())
    }

    fn member_of(&mut self, path: &ResolvedPath, values: Vec<Value>) -> Expr {
        Expr::Member(path.to_string(), values)
    }

    fn is_null(&mut self, path: &ResolvedPath) -> Expr {
        Expr::IsNull(path.to_string())
    }

    fn is_not_null(&mut self, path: &ResolvedPath) -> Expr {
        Expr::IsNotNull(path.to_string())
    }
}
