//! Integration tests for the public compiler surface
//!
//! Compiles criteria with a predicate builder defined outside the crate, the
//! way a storage backend would.

use sieve_query::{
    criteria_from_triples, Comparison, CriteriaCompiler, Criterion, Direction, DynamicQuery,
    EntitySchema, FieldType, OperatorKind, PredicateBuilder, QueryBuilder, QueryError,
    ResolvedPath, Schema, Selection, TextMatch, Value,
};
use std::sync::Arc;

/// Renders predicates as infix text
struct Infix;

impl PredicateBuilder for Infix {
    type Predicate = String;

    fn and(&mut self, predicates: Vec<String>) -> String {
        if predicates.is_empty() {
            return "true".to_string();
        }
        format!("({})", predicates.join(" and "))
    }

    fn or(&mut self, predicates: Vec<String>) -> String {
        if predicates.is_empty() {
            return "false".to_string();
        }
        format!("({})", predicates.join(" or "))
    }

    fn not(&mut self, predicate: String) -> String {
        format!("!{}", predicate)
    }

    fn compare(&mut self, path: &ResolvedPath, op: Comparison, value: Value) -> String {
        format!("{}{}{}", path, op.symbol(), value)
    }

    fn text_match(
        &mut self,
        path: &ResolvedPath,
        pattern: &str,
        mode: TextMatch,
        case_sensitive: bool,
    ) -> String {
        let flag = if case_sensitive { "" } else { "i" };
        match mode {
            TextMatch::Contains => format!("{} ~{} *{}*", path, flag, pattern),
            TextMatch::StartsWith => format!("{} ~{} {}*", path, flag, pattern),
            TextMatch::EndsWith => format!("{} ~{} *{}", path, flag, pattern),
        }
    }

    fn member_of(&mut self, path: &ResolvedPath, values: Vec<Value>) -> String {
        let values: Vec<String> = values.iter().map(ToString::to_string).collect();
        format!("{} in [{}]", path, values.join(","))
    }

    fn is_null(&mut self, path: &ResolvedPath) -> String {
        format!("{} is null", path)
    }

    fn is_not_null(&mut self, path: &ResolvedPath) -> String {
        format!("{} is not null", path)
    }
}

fn schema() -> Schema {
    Schema::new(
        EntitySchema::new("course", "courses")
            .field("a", FieldType::Integer)
            .field("b", FieldType::Integer)
            .field("name", FieldType::Text)
            .field("credits", FieldType::Float)
            .relation("teacher", "person", "teacher_id", "id"),
    )
    .with_entity(
        EntitySchema::new("person", "people")
            .field("id", FieldType::Integer)
            .field("name", FieldType::Text),
    )
}

fn compile(criteria: &[Criterion]) -> Result<Option<String>, QueryError> {
    CriteriaCompiler::new(Arc::new(schema())).compile(criteria, &mut Infix)
}

#[test]
fn test_or_sentinel_end_to_end() {
    let criteria = [
        Criterion::single("a", OperatorKind::Equal, 1),
        Criterion::or(),
        Criterion::single("b", OperatorKind::Equal, 2),
    ];

    let compiled = compile(&criteria).unwrap().unwrap();
    insta::assert_snapshot!(compiled, @"(a=1 or b=2)");
}

#[test]
fn test_contain_end_to_end() {
    let criteria = [Criterion::single("name", OperatorKind::Contain, "Calc")];
    let compiled = compile(&criteria).unwrap().unwrap();
    insta::assert_snapshot!(compiled, @"name ~i *Calc*");
}

#[test]
fn test_wire_triples_keep_order() {
    let criteria = criteria_from_triples(vec![
        ("teacher<name", "start_with".to_string(), vec!["Ada"]),
        ("", "OR".to_string(), vec![]),
        ("credits", "GREATER_THAN".to_string(), vec!["2.5"]),
        ("b", "not_in".to_string(), vec!["1", "2"]),
    ])
    .unwrap();

    let compiled = compile(&criteria).unwrap().unwrap();
    insta::assert_snapshot!(compiled, @"(teacher<name ~i Ada* or (credits>2.5 and !b in [1,2]))");
}

#[test]
fn test_unknown_operator_name() {
    let err = criteria_from_triples(vec![("a", "LIKE".to_string(), vec!["x"])]).unwrap_err();
    assert!(matches!(err, QueryError::UnknownOperator { name } if name == "LIKE"));
}

#[test]
fn test_unknown_relation() {
    let criteria = [Criterion::single("student.name", OperatorKind::Equal, "x")];
    assert!(matches!(
        compile(&criteria),
        Err(QueryError::UnknownField { segment, .. }) if segment == "student"
    ));
}

#[test]
fn test_builder_envelope_round_trips_as_json() {
    let query = QueryBuilder::detached()
        .select_as("teacher.name", "teacher")
        .filter(Criterion::single("a", OperatorKind::LessThan, "10"))
        .order_by("a", Direction::Desc)
        .page(1, 5)
        .build();

    let json = serde_json::to_value(&query).unwrap();
    assert_eq!(json["pageNumber"], 1);
    assert_eq!(json["where"][0]["operator"], "LESS_THAN");
    assert_eq!(json["orderBy"][0]["direction"], "DESC");

    let back: DynamicQuery = serde_json::from_value(json).unwrap();
    assert_eq!(back, query);
    assert_eq!(back.select, vec![Selection::aliased("teacher.name", "teacher")]);
}
