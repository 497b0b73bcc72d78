use sieve_query::{EntitySchema, FieldType, Schema};

/// employee → dept → addr
pub fn company() -> Schema {
    Schema::new(
        EntitySchema::new("employee", "employees")
            .field("id", FieldType::Integer)
            .field("name", FieldType::Text)
            .field("age", FieldType::Integer)
            .field("active", FieldType::Boolean)
            .field("hired", FieldType::Date)
            .field("status", FieldType::enumeration(["ACTIVE", "RETIRED"]))
            .relation("dept", "department", "dept_id", "id"),
    )
    .with_entity(
        EntitySchema::new("department", "departments")
            .field("id", FieldType::Integer)
            .field("name", FieldType::Text)
            .relation("addr", "address", "addr_id", "id"),
    )
    .with_entity(
        EntitySchema::new("address", "addresses")
            .field("id", FieldType::Integer)
            .field("city", FieldType::Text),
    )
}
