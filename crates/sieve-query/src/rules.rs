//! Operator rules.
//!
//! One [`OperatorRule`] per [`OperatorKind`] turns a resolved criterion into a
//! backend predicate. Rules are generic over the predicate type and speak
//! only the [`PredicateBuilder`] capability set, so a registry of the
//! standard rules serves every backend.

use crate::criteria::{Criterion, OperatorKind};
use crate::error::{QueryError, QueryResult};
use crate::key_path::ResolvedPath;
use crate::predicate::{conjoin, Comparison, PredicateBuilder, TextMatch};
use crate::value::{parse_bool, FieldType, Value, ValueDeserializer};
use serde_json::Value as RawValue;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-criterion inputs a rule may consult.
pub struct RuleContext<'a> {
    /// Declared type of the field the criterion's key resolves to
    pub field_type: &'a FieldType,
    pub deserializer: &'a dyn ValueDeserializer,
    pub case_sensitive_text: bool,
}

impl RuleContext<'_> {
    fn coerce(&self, criterion: &Criterion, raw: &RawValue) -> QueryResult<Value> {
        self.deserializer
            .deserialize(&criterion.key, raw, self.field_type)
    }

    fn coerce_all(&self, criterion: &Criterion) -> QueryResult<Vec<Value>> {
        criterion
            .values
            .iter()
            .map(|raw| self.coerce(criterion, raw))
            .collect()
    }
}

/// Predicate-generation strategy for one operator.
pub trait OperatorRule<P>: Send + Sync {
    fn generate_predicate(
        &self,
        context: &RuleContext<'_>,
        path: &ResolvedPath,
        builder: &mut dyn PredicateBuilder<Predicate = P>,
        criterion: &Criterion,
    ) -> QueryResult<P>;
}

fn first_value(criterion: &Criterion) -> QueryResult<&RawValue> {
    criterion
        .first_value()
        .ok_or_else(|| QueryError::NoAvailableValue {
            key: criterion.key.clone(),
            operator: criterion.operator,
        })
}

fn require_values(criterion: &Criterion) -> QueryResult<()> {
    first_value(criterion).map(|_| ())
}

fn require_text(context: &RuleContext<'_>, criterion: &Criterion) -> QueryResult<()> {
    if context.field_type.is_text() {
        Ok(())
    } else {
        Err(QueryError::TypeMismatch {
            key: criterion.key.clone(),
            operator: criterion.operator,
            expected: FieldType::Text.to_string(),
            found: context.field_type.to_string(),
        })
    }
}

/// EQUAL and the ordering family: compare against the first value.
///
/// A null first value under EQUAL becomes IS NULL.
pub struct ComparisonRule(pub Comparison);

impl<P> OperatorRule<P> for ComparisonRule {
    fn generate_predicate(
        &self,
        context: &RuleContext<'_>,
        path: &ResolvedPath,
        builder: &mut dyn PredicateBuilder<Predicate = P>,
        criterion: &Criterion,
    ) -> QueryResult<P> {
        let value = context.coerce(criterion, first_value(criterion)?)?;
        if value.is_null() && self.0 == Comparison::Eq {
            return Ok(builder.is_null(path));
        }
        Ok(builder.compare(path, self.0, value))
    }
}

/// NOT_EQUAL: `≠ v` for every value, ANDed.
pub struct NotEqualRule;

impl<P> OperatorRule<P> for NotEqualRule {
    fn generate_predicate(
        &self,
        context: &RuleContext<'_>,
        path: &ResolvedPath,
        builder: &mut dyn PredicateBuilder<Predicate = P>,
        criterion: &Criterion,
    ) -> QueryResult<P> {
        require_values(criterion)?;
        let predicates = context
            .coerce_all(criterion)?
            .into_iter()
            .map(|value| {
                if value.is_null() {
                    builder.is_not_null(path)
                } else {
                    builder.compare(path, Comparison::Ne, value)
                }
            })
            .collect();
        Ok(conjoin(builder, predicates))
    }
}

/// CONTAIN / START_WITH / END_WITH, and NOT_CONTAIN when `negated`.
///
/// Every value must match (or, negated, must not match).
pub struct TextRule {
    pub mode: TextMatch,
    pub negated: bool,
}

impl<P> OperatorRule<P> for TextRule {
    fn generate_predicate(
        &self,
        context: &RuleContext<'_>,
        path: &ResolvedPath,
        builder: &mut dyn PredicateBuilder<Predicate = P>,
        criterion: &Criterion,
    ) -> QueryResult<P> {
        require_values(criterion)?;
        require_text(context, criterion)?;

        let mut predicates = Vec::with_capacity(criterion.values.len());
        for raw in &criterion.values {
            let value = context.coerce(criterion, raw)?;
            let Some(pattern) = value.as_text() else {
                return Err(QueryError::IllegalValue {
                    key: criterion.key.clone(),
                    operator: criterion.operator,
                    value: raw.to_string(),
                });
            };
            let matched = builder.text_match(path, pattern, self.mode, context.case_sensitive_text);
            predicates.push(if self.negated {
                builder.not(matched)
            } else {
                matched
            });
        }
        Ok(conjoin(builder, predicates))
    }
}

/// IN, and NOT_IN when `negated`. Empty IN is always-false, empty NOT_IN
/// always-true.
pub struct MembershipRule {
    pub negated: bool,
}

impl<P> OperatorRule<P> for MembershipRule {
    fn generate_predicate(
        &self,
        context: &RuleContext<'_>,
        path: &ResolvedPath,
        builder: &mut dyn PredicateBuilder<Predicate = P>,
        criterion: &Criterion,
    ) -> QueryResult<P> {
        let values = context.coerce_all(criterion)?;
        if values.is_empty() {
            return Ok(if self.negated {
                builder.and(Vec::new())
            } else {
                builder.or(Vec::new())
            });
        }

        let member = builder.member_of(path, values);
        Ok(if self.negated {
            builder.not(member)
        } else {
            member
        })
    }
}

/// SPECIFIED: `true` is IS NOT NULL, `false` is IS NULL.
pub struct SpecifiedRule;

impl<P> OperatorRule<P> for SpecifiedRule {
    fn generate_predicate(
        &self,
        _context: &RuleContext<'_>,
        path: &ResolvedPath,
        builder: &mut dyn PredicateBuilder<Predicate = P>,
        criterion: &Criterion,
    ) -> QueryResult<P> {
        let raw = first_value(criterion)?;
        let specified = match raw {
            RawValue::Bool(b) => Some(*b),
            RawValue::String(s) => parse_bool(s),
            _ => None,
        };

        match specified {
            Some(true) => Ok(builder.is_not_null(path)),
            Some(false) => Ok(builder.is_null(path)),
            None => Err(QueryError::IllegalValue {
                key: criterion.key.clone(),
                operator: criterion.operator,
                value: raw.to_string(),
            }),
        }
    }
}

/// Operator → rule table for one predicate type.
pub struct RuleRegistry<P> {
    rules: HashMap<OperatorKind, Arc<dyn OperatorRule<P>>>,
}

impl<P> Default for RuleRegistry<P> {
    fn default() -> Self {
        Self::standard()
    }
}

impl<P> RuleRegistry<P> {
    /// Registry with no rules at all
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Registry with a rule for every non-structural operator
    pub fn standard() -> Self {
        let text = |mode, negated| -> Arc<dyn OperatorRule<P>> {
            Arc::new(TextRule { mode, negated })
        };
        let compare = |op| -> Arc<dyn OperatorRule<P>> { Arc::new(ComparisonRule(op)) };

        let mut registry = Self::empty();
        registry.register(OperatorKind::Equal, compare(Comparison::Eq));
        registry.register(OperatorKind::NotEqual, Arc::new(NotEqualRule));
        registry.register(OperatorKind::LessThan, compare(Comparison::Lt));
        registry.register(OperatorKind::LessThanOrEqual, compare(Comparison::Le));
        registry.register(OperatorKind::GreaterThan, compare(Comparison::Gt));
        registry.register(OperatorKind::GreaterThanOrEqual, compare(Comparison::Ge));
        registry.register(OperatorKind::Contain, text(TextMatch::Contains, false));
        registry.register(OperatorKind::NotContain, text(TextMatch::Contains, true));
        registry.register(OperatorKind::StartWith, text(TextMatch::StartsWith, false));
        registry.register(OperatorKind::EndWith, text(TextMatch::EndsWith, false));
        registry.register(OperatorKind::In, Arc::new(MembershipRule { negated: false }));
        registry.register(OperatorKind::NotIn, Arc::new(MembershipRule { negated: true }));
        registry.register(OperatorKind::Specified, Arc::new(SpecifiedRule));
        registry
    }

    /// Install or replace the rule for `operator`. Structural operators are
    /// handled by reduction and never reach a rule.
    pub fn register(&mut self, operator: OperatorKind, rule: Arc<dyn OperatorRule<P>>) {
        self.rules.insert(operator, rule);
    }

    pub fn unregister(&mut self, operator: OperatorKind) -> Option<Arc<dyn OperatorRule<P>>> {
        self.rules.remove(&operator)
    }

    pub fn supports(&self, operator: OperatorKind) -> bool {
        !operator.is_structural() && self.rules.contains_key(&operator)
    }

    /// Dispatch `criterion` to its rule
    pub fn generate_predicate(
        &self,
        context: &RuleContext<'_>,
        path: &ResolvedPath,
        builder: &mut dyn PredicateBuilder<Predicate = P>,
        criterion: &Criterion,
    ) -> QueryResult<P> {
        let rule = self
            .rules
            .get(&criterion.operator)
            .filter(|_| !criterion.is_structural())
            .ok_or_else(|| QueryError::UnsupportedOperator {
                key: criterion.key.clone(),
                operator: criterion.operator,
            })?;
        rule.generate_predicate(context, path, builder, criterion)
    }
}
