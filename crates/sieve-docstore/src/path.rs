//! Key-path lookup inside JSON documents.
//!
//! Relation hops are nested object keys. Arrays met along the way fan out:
//! `tags.name` over `{"tags": [{"name": "a"}, {"name": "b"}]}` yields both
//! names. Join kinds do not change traversal.

use serde_json::Value as RawValue;
use sieve_query::ResolvedPath;
use std::cmp::Ordering;

static NULL: RawValue = RawValue::Null;

/// Every value `path` reaches in `document`, arrays flattened one level per hop
pub fn values_at<'d>(document: &'d RawValue, path: &ResolvedPath) -> Vec<&'d RawValue> {
    let mut current = vec![document];
    for segment in path.relations().chain(std::iter::once(path.field.as_str())) {
        current = current
            .into_iter()
            .filter_map(|value| value.get(segment))
            .flat_map(|value| match value {
                RawValue::Array(items) => items.iter().collect::<Vec<_>>(),
                other => vec![other],
            })
            .collect();
    }
    current
}

/// Projected value: the single value reached, an array of several, or null
pub fn project(document: &RawValue, path: &ResolvedPath) -> RawValue {
    let mut values = values_at(document, path);
    match values.len() {
        0 => RawValue::Null,
        1 => values.remove(0).clone(),
        _ => RawValue::Array(values.into_iter().cloned().collect()),
    }
}

/// First value reached, for ordering and grouping
pub fn first_at<'d>(document: &'d RawValue, path: &ResolvedPath) -> &'d RawValue {
    values_at(document, path)
        .into_iter()
        .next()
        .unwrap_or(&NULL)
}

fn rank(value: &RawValue) -> u8 {
    match value {
        RawValue::Null => 0,
        RawValue::Bool(_) => 1,
        RawValue::Number(_) => 2,
        RawValue::String(_) => 3,
        RawValue::Array(_) => 4,
        RawValue::Object(_) => 5,
    }
}

/// Total order over JSON values: null < booleans < numbers < strings < the rest
pub fn compare_json(a: &RawValue, b: &RawValue) -> Ordering {
    match (a, b) {
        (RawValue::Bool(x), RawValue::Bool(y)) => x.cmp(y),
        (RawValue::Number(x), RawValue::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .unwrap_or(f64::NAN)
                .total_cmp(&y.as_f64().unwrap_or(f64::NAN)),
        },
        (RawValue::String(x), RawValue::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
