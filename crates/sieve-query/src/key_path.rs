//! Key-path resolution.
//!
//! A filter key such as `dept.addr<city` encodes a chain of relation hops
//! followed by a terminal field. Each [`JoinKind`] owns one separator
//! character, so the separator itself says how the hop is joined:
//!
//! | separator | join kind |
//! |-----------|-----------|
//! | `.`       | inner     |
//! | `<`       | left      |
//! | `>`       | right     |

use crate::error::{QueryError, QueryResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a relation hop is traversed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub const ALL: [JoinKind; 3] = [Self::Inner, Self::Left, Self::Right];

    pub fn separator(self) -> char {
        match self {
            Self::Inner => '.',
            Self::Left => '<',
            Self::Right => '>',
        }
    }

    pub fn from_separator(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.separator() == c)
    }
}

/// One relation hop
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Join {
    pub relation: String,
    pub kind: JoinKind,
}

/// A parsed key path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedPath {
    pub joins: Vec<Join>,
    pub field: String,
}

impl ResolvedPath {
    /// Path to a field on the root entity
    pub fn field(field: impl Into<String>) -> Self {
        Self {
            joins: Vec::new(),
            field: field.into(),
        }
    }

    pub fn is_local(&self) -> bool {
        self.joins.is_empty()
    }

    pub fn relations(&self) -> impl Iterator<Item = &str> {
        self.joins.iter().map(|join| join.relation.as_str())
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for join in &self.joins {
            write!(f, "{}{}", join.relation, join.kind.separator())?;
        }
        f.write_str(&self.field)
    }
}

/// Split `key` into relation hops and a terminal field.
pub fn resolve(key: &str) -> QueryResult<ResolvedPath> {
    let mut joins = Vec::new();
    let mut rest = key;

    while let Some((index, kind)) = next_separator(rest) {
        let segment = &rest[..index];
        if segment.is_empty() {
            return Err(QueryError::MalformedKeyPath {
                key: key.to_string(),
                reason: format!(
                    "empty relation before '{}' (hop #{})",
                    kind.separator(),
                    joins.len() + 1
                ),
            });
        }
        joins.push(Join {
            relation: segment.to_string(),
            kind,
        });
        // separators are all single-byte ASCII
        rest = &rest[index + 1..];
    }

    if rest.is_empty() {
        return Err(QueryError::MalformedKeyPath {
            key: key.to_string(),
            reason: "empty field name".to_string(),
        });
    }

    Ok(ResolvedPath {
        joins,
        field: rest.to_string(),
    })
}

/// Last component of a key path, without validating it
pub fn terminal_name(key: &str) -> &str {
    match key.rfind(|c: char| JoinKind::from_separator(c).is_some()) {
        Some(index) => &key[index + 1..],
        None => key,
    }
}

fn next_separator(s: &str) -> Option<(usize, JoinKind)> {
    s.char_indices()
        .find_map(|(index, c)| JoinKind::from_separator(c).map(|kind| (index, kind)))
}
