//! Typed comparison values and raw-value coercion.
//!
//! Criteria carry opaque JSON values, usually strings straight from a
//! query-string binding. Before a rule can compare them against a column it
//! converts them into a [`Value`] of the field's declared [`FieldType`] with a
//! [`ValueDeserializer`].

use crate::error::{QueryError, QueryResult};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as RawValue;
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// Declared type of an entity field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "variants")]
pub enum FieldType {
    Text,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    Uuid,
    /// Enum matched by variant name
    Enum(Vec<String>),
}

impl FieldType {
    /// Enum over the given variant names
    pub fn enumeration<I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum(variants.into_iter().map(Into::into).collect())
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Integer => f.write_str("integer"),
            Self::Float => f.write_str("float"),
            Self::Boolean => f.write_str("boolean"),
            Self::Date => f.write_str("date"),
            Self::DateTime => f.write_str("datetime"),
            Self::Uuid => f.write_str("uuid"),
            Self::Enum(variants) => write!(f, "enum({})", variants.join("|")),
        }
    }
}

/// A value coerced to a field's native type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Uuid(Uuid),
    Enum(String),
}

impl Value {
    /// JSON form used for bind parameters and document comparison.
    ///
    /// Dates render as ISO-8601 and date-times as RFC 3339 in UTC
    /// (`+00:00`). Stored text in other offsets or with `Z` does not compare
    /// equal byte for byte, so backends compare dates by value.
    pub fn to_json(&self) -> RawValue {
        match self {
            Self::Null => RawValue::Null,
            Self::Text(s) | Self::Enum(s) => RawValue::String(s.clone()),
            Self::Integer(i) => RawValue::from(*i),
            Self::Float(f) => RawValue::from(*f),
            Self::Boolean(b) => RawValue::Bool(*b),
            Self::Date(d) => RawValue::String(d.format("%Y-%m-%d").to_string()),
            Self::DateTime(dt) => RawValue::String(dt.to_rfc3339()),
            Self::Uuid(u) => RawValue::String(u.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Compare two values of compatible kinds.
    ///
    /// Integers and floats compare numerically with each other; any other
    /// kind pairing (or a NaN) is incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) | (Self::Enum(a), Self::Enum(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Integer(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (Self::DateTime(a), Self::DateTime(b)) => Some(a.cmp(b)),
            (Self::Uuid(a), Self::Uuid(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Text content for pattern matching, if this is textual
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Enum(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_json() {
            RawValue::String(s) => f.write_str(&s),
            other => write!(f, "{}", other),
        }
    }
}

/// Converts a raw criterion value into a typed [`Value`].
pub trait ValueDeserializer: Send + Sync {
    /// `key` is only used to name the criterion in errors.
    fn deserialize(&self, key: &str, raw: &RawValue, target: &FieldType) -> QueryResult<Value>;
}

/// Default coercion strategy.
///
/// Accepts strings for every type, native JSON numbers and booleans where
/// they fit, ISO-8601 dates, RFC 3339 date-times (a bare date means midnight
/// UTC) and hyphenated UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDeserializer;

impl ValueDeserializer for StandardDeserializer {
    fn deserialize(&self, key: &str, raw: &RawValue, target: &FieldType) -> QueryResult<Value> {
        if raw.is_null() {
            return Ok(Value::Null);
        }

        let coerced = match target {
            FieldType::Text => match raw {
                RawValue::String(s) => Some(Value::Text(s.clone())),
                RawValue::Number(n) => Some(Value::Text(n.to_string())),
                RawValue::Bool(b) => Some(Value::Text(b.to_string())),
                _ => None,
            },
            FieldType::Integer => match raw {
                RawValue::String(s) => s.trim().parse().ok().map(Value::Integer),
                RawValue::Number(n) => n.as_i64().map(Value::Integer),
                _ => None,
            },
            FieldType::Float => match raw {
                RawValue::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(Value::Float),
                RawValue::Number(n) => n.as_f64().map(Value::Float),
                _ => None,
            },
            FieldType::Boolean => match raw {
                RawValue::Bool(b) => Some(Value::Boolean(*b)),
                RawValue::String(s) => parse_bool(s).map(Value::Boolean),
                _ => None,
            },
            FieldType::Date => raw
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
                .map(Value::Date),
            FieldType::DateTime => raw.as_str().and_then(parse_datetime).map(Value::DateTime),
            FieldType::Uuid => raw
                .as_str()
                .and_then(|s| Uuid::parse_str(s.trim()).ok())
                .map(Value::Uuid),
            FieldType::Enum(variants) => raw
                .as_str()
                .filter(|s| variants.iter().any(|v| v == s))
                .map(|s| Value::Enum(s.to_string())),
        };

        coerced.ok_or_else(|| QueryError::ValueCoercion {
            key: key.to_string(),
            raw: raw.to_string(),
            target: target.to_string(),
        })
    }
}

/// `true` / `false`, ignoring ASCII case and surrounding whitespace
pub fn parse_bool(s: &str) -> Option<bool> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}
