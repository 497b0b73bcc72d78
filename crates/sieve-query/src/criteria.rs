//! Criteria model.
//!
//! A query is described by a [`DynamicQuery`] envelope whose filters are a
//! flat, ordered sequence of [`Criterion`]. Grouping is expressed in-band by
//! sentinel criteria (`OR`, `OPEN_PARENTHESES`, `CLOSE_PARENTHESES`); the
//! order of the sequence is therefore significant.

use crate::error::{QueryError, QueryResult};
use crate::key_path::resolve;
use serde::{Deserialize, Serialize};
use serde_json::Value as RawValue;
use std::fmt;
use std::str::FromStr;

/// Closed set of criterion operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatorKind {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Contain,
    NotContain,
    StartWith,
    EndWith,
    In,
    NotIn,
    /// `true` selects IS NOT NULL, `false` selects IS NULL
    Specified,
    Or,
    OpenParentheses,
    CloseParentheses,
}

impl OperatorKind {
    /// Every operator, in declaration order
    pub const ALL: [OperatorKind; 16] = [
        Self::Equal,
        Self::NotEqual,
        Self::LessThan,
        Self::LessThanOrEqual,
        Self::GreaterThan,
        Self::GreaterThanOrEqual,
        Self::Contain,
        Self::NotContain,
        Self::StartWith,
        Self::EndWith,
        Self::In,
        Self::NotIn,
        Self::Specified,
        Self::Or,
        Self::OpenParentheses,
        Self::CloseParentheses,
    ];

    /// Wire name, e.g. `GREATER_THAN_OR_EQUAL`
    pub fn name(self) -> &'static str {
        match self {
            Self::Equal => "EQUAL",
            Self::NotEqual => "NOT_EQUAL",
            Self::LessThan => "LESS_THAN",
            Self::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
            Self::GreaterThan => "GREATER_THAN",
            Self::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
            Self::Contain => "CONTAIN",
            Self::NotContain => "NOT_CONTAIN",
            Self::StartWith => "START_WITH",
            Self::EndWith => "END_WITH",
            Self::In => "IN",
            Self::NotIn => "NOT_IN",
            Self::Specified => "SPECIFIED",
            Self::Or => "OR",
            Self::OpenParentheses => "OPEN_PARENTHESES",
            Self::CloseParentheses => "CLOSE_PARENTHESES",
        }
    }

    /// Sentinels that shape grouping instead of filtering
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            Self::Or | Self::OpenParentheses | Self::CloseParentheses
        )
    }

    /// Operators that only make sense on text fields
    pub fn is_text(self) -> bool {
        matches!(
            self,
            Self::Contain | Self::NotContain | Self::StartWith | Self::EndWith
        )
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OperatorKind {
    type Err = QueryError;

    /// Case-insensitive; accepts the wire name of any operator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| QueryError::UnknownOperator {
                name: s.to_string(),
            })
    }
}

/// One filter condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub key: String,
    pub operator: OperatorKind,
    #[serde(default)]
    pub values: Vec<RawValue>,
}

impl Criterion {
    pub fn new<V>(key: impl Into<String>, operator: OperatorKind, values: V) -> Self
    where
        V: IntoIterator,
        V::Item: Into<RawValue>,
    {
        Self {
            key: key.into(),
            operator,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Criterion with exactly one value
    pub fn single(
        key: impl Into<String>,
        operator: OperatorKind,
        value: impl Into<RawValue>,
    ) -> Self {
        Self {
            key: key.into(),
            operator,
            values: vec![value.into()],
        }
    }

    /// OR sentinel
    pub fn or() -> Self {
        Self::sentinel(OperatorKind::Or)
    }

    /// OPEN_PARENTHESES sentinel
    pub fn open() -> Self {
        Self::sentinel(OperatorKind::OpenParentheses)
    }

    /// CLOSE_PARENTHESES sentinel
    pub fn close() -> Self {
        Self::sentinel(OperatorKind::CloseParentheses)
    }

    fn sentinel(operator: OperatorKind) -> Self {
        Self {
            key: String::new(),
            operator,
            values: Vec::new(),
        }
    }

    /// Build from a wire-level `(key, operatorName, values)` triple.
    pub fn from_triple<V>(key: impl Into<String>, operator: &str, values: V) -> QueryResult<Self>
    where
        V: IntoIterator,
        V::Item: Into<RawValue>,
    {
        Ok(Self::new(key, operator.parse()?, values))
    }

    pub fn is_structural(&self) -> bool {
        self.operator.is_structural()
    }

    pub fn first_value(&self) -> Option<&RawValue> {
        self.values.first()
    }
}

/// Map wire triples 1:1 into criteria, preserving their order.
pub fn criteria_from_triples<I, K, V>(triples: I) -> QueryResult<Vec<Criterion>>
where
    I: IntoIterator<Item = (K, String, V)>,
    K: Into<String>,
    V: IntoIterator,
    V::Item: Into<RawValue>,
{
    triples
        .into_iter()
        .map(|(key, operator, values)| Criterion::from_triple(key, &operator, values))
        .collect()
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// A projected field with an optional output alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Selection {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            alias: None,
        }
    }

    pub fn aliased(field: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            alias: Some(alias.into()),
        }
    }

    /// Output column name: the alias, or the field path's last component
    pub fn output_name(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => crate::key_path::terminal_name(&self.field),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ordering {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
}

impl Ordering {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Zero-based page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        u64::from(self.number) * u64::from(self.size)
    }
}

/// The full query envelope.
///
/// Owned by one construction session. Backend adapters only ever receive it
/// by shared reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DynamicQuery {
    pub distinct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    pub select: Vec<Selection>,
    #[serde(rename = "where")]
    pub criteria: Vec<Criterion>,
    pub order_by: Vec<Ordering>,
    pub group_by: Vec<String>,
    pub having: Vec<Criterion>,
}

impl DynamicQuery {
    /// Query with only filters set
    pub fn with_criteria(criteria: Vec<Criterion>) -> Self {
        Self {
            criteria,
            ..Default::default()
        }
    }

    /// Page coordinates, if both halves are present.
    pub fn page_request(&self) -> QueryResult<PageRequest> {
        match (self.page_number, self.page_size) {
            (Some(_), Some(0)) => Err(QueryError::InvalidPageSize { size: 0, max: u32::MAX }),
            (Some(number), Some(size)) => Ok(PageRequest { number, size }),
            _ => Err(QueryError::MissingPageParameters),
        }
    }

    /// Page coordinates when paging is requested, `None` otherwise
    pub fn page_request_opt(&self) -> QueryResult<Option<PageRequest>> {
        if self.page_number.is_none() && self.page_size.is_none() {
            return Ok(None);
        }
        self.page_request().map(Some)
    }

    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty()
    }

    /// Reject HAVING criteria whose key is not a GROUP BY key.
    ///
    /// Keys match on relation chain and field; join kinds are ignored. An
    /// ungrouped query therefore accepts no HAVING criteria at all.
    pub fn check_having(&self) -> QueryResult<()> {
        let grouped = self
            .group_by
            .iter()
            .map(|key| resolve(key))
            .collect::<QueryResult<Vec<_>>>()?;

        for criterion in self.having.iter().filter(|c| !c.is_structural()) {
            let path = resolve(&criterion.key)?;
            let is_group_key = grouped
                .iter()
                .any(|g| g.field == path.field && g.relations().eq(path.relations()));
            if !is_group_key {
                return Err(QueryError::HavingOutsideGroup {
                    key: criterion.key.clone(),
                });
            }
        }
        Ok(())
    }
}
