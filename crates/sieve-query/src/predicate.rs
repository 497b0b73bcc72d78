//! Backend predicate-builder capability.
//!
//! Operator rules never construct backend predicates directly; they call
//! into a [`PredicateBuilder`]. Supplying a different builder retargets the
//! same rules at another storage engine.

use crate::key_path::ResolvedPath;
use crate::value::Value;
use std::fmt;

/// Binary comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    /// SQL spelling
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Whether an ordering outcome satisfies this comparison
    pub fn holds(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Self::Eq => ordering == Equal,
            Self::Ne => ordering != Equal,
            Self::Lt => ordering == Less,
            Self::Le => ordering != Greater,
            Self::Gt => ordering == Greater,
            Self::Ge => ordering != Less,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Where in the field a text pattern must occur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextMatch {
    Contains,
    StartsWith,
    EndsWith,
}

impl TextMatch {
    /// Test `haystack` against `needle` in this mode.
    pub fn matches(self, haystack: &str, needle: &str, case_sensitive: bool) -> bool {
        if case_sensitive {
            self.matches_exact(haystack, needle)
        } else {
            self.matches_exact(&haystack.to_lowercase(), &needle.to_lowercase())
        }
    }

    fn matches_exact(self, haystack: &str, needle: &str) -> bool {
        match self {
            Self::Contains => haystack.contains(needle),
            Self::StartsWith => haystack.starts_with(needle),
            Self::EndsWith => haystack.ends_with(needle),
        }
    }
}

/// Capability set every backend supplies.
///
/// Conventions the rules rely on: `and(vec![])` is always-true and
/// `or(vec![])` is always-false.
pub trait PredicateBuilder {
    type Predicate;

    fn and(&mut self, predicates: Vec<Self::Predicate>) -> Self::Predicate;

    fn or(&mut self, predicates: Vec<Self::Predicate>) -> Self::Predicate;

    fn not(&mut self, predicate: Self::Predicate) -> Self::Predicate;

    fn compare(&mut self, path: &ResolvedPath, op: Comparison, value: Value) -> Self::Predicate;

    fn text_match(
        &mut self,
        path: &ResolvedPath,
        pattern: &str,
        mode: TextMatch,
        case_sensitive: bool,
    ) -> Self::Predicate;

    fn member_of(&mut self, path: &ResolvedPath, values: Vec<Value>) -> Self::Predicate;

    fn is_null(&mut self, path: &ResolvedPath) -> Self::Predicate;

    fn is_not_null(&mut self, path: &ResolvedPath) -> Self::Predicate;
}

/// AND that collapses a single operand instead of wrapping it
pub fn conjoin<P>(builder: &mut dyn PredicateBuilder<Predicate = P>, mut predicates: Vec<P>) -> P {
    if predicates.len() == 1 {
        predicates.remove(0)
    } else {
        builder.and(predicates)
    }
}

/// OR that collapses a single operand instead of wrapping it
pub fn disjoin<P>(builder: &mut dyn PredicateBuilder<Predicate = P>, mut predicates: Vec<P>) -> P {
    if predicates.len() == 1 {
        predicates.remove(0)
    } else {
        builder.or(predicates)
    }
}
