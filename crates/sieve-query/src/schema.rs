//! Entity metadata used to type-check criteria.
//!
//! The compiler needs one thing from entity metadata: the declared type of
//! the field a key path lands on ([`FieldTypeLookup`]). [`Schema`] is an
//! explicitly constructed implementation that also carries the relation
//! keys relational backends need to render joins.

use crate::error::{QueryError, QueryResult};
use crate::key_path::ResolvedPath;
use crate::value::FieldType;
use std::collections::BTreeMap;

/// Declared type of the field at the end of a resolved path.
pub trait FieldTypeLookup: Send + Sync {
    fn type_of(&self, path: &ResolvedPath) -> QueryResult<FieldType>;
}

/// Foreign-key description of a relation hop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Target entity name
    pub target: String,
    /// Column on the owning entity
    pub local_column: String,
    /// Column on the target entity
    pub foreign_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    pub name: String,
    /// Table or collection name
    pub table: String,
    pub fields: BTreeMap<String, FieldType>,
    pub relations: BTreeMap<String, Relation>,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            fields: BTreeMap::new(),
            relations: BTreeMap::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.insert(name.into(), field_type);
        self
    }

    /// Declare a relation `name` → `target` joined on
    /// `self.local_column = target.foreign_column`.
    pub fn relation(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        local_column: impl Into<String>,
        foreign_column: impl Into<String>,
    ) -> Self {
        self.relations.insert(
            name.into(),
            Relation {
                target: target.into(),
                local_column: local_column.into(),
                foreign_column: foreign_column.into(),
            },
        );
        self
    }
}

/// A set of entities with one designated query root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    root: String,
    entities: BTreeMap<String, EntitySchema>,
}

impl Schema {
    /// Schema rooted at `root`, which is also registered
    pub fn new(root: EntitySchema) -> Self {
        let name = root.name.clone();
        let mut entities = BTreeMap::new();
        entities.insert(name.clone(), root);
        Self {
            root: name,
            entities,
        }
    }

    pub fn with_entity(mut self, entity: EntitySchema) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    pub fn root(&self) -> &EntitySchema {
        // the root is inserted in `new` and never removed
        &self.entities[&self.root]
    }

    pub fn entity(&self, name: &str) -> Option<&EntitySchema> {
        self.entities.get(name)
    }

    /// Same entities, different query root
    pub fn rooted_at(&self, name: &str) -> Option<Self> {
        self.entities.contains_key(name).then(|| Self {
            root: name.to_string(),
            entities: self.entities.clone(),
        })
    }

    /// Walk the relation hops of `path`, returning each hop's relation and
    /// the entity it lands on, in order.
    pub fn walk<'a>(
        &'a self,
        path: &ResolvedPath,
    ) -> QueryResult<Vec<(&'a Relation, &'a EntitySchema)>> {
        let mut current = self.root();
        let mut hops = Vec::with_capacity(path.joins.len());

        for join in &path.joins {
            let relation = current.relations.get(&join.relation).ok_or_else(|| {
                QueryError::UnknownField {
                    key: path.to_string(),
                    segment: join.relation.clone(),
                }
            })?;
            let target = self.entity(&relation.target).ok_or_else(|| QueryError::UnknownField {
                key: path.to_string(),
                segment: relation.target.clone(),
            })?;
            hops.push((relation, target));
            current = target;
        }

        Ok(hops)
    }

    /// Entity owning the terminal field of `path`
    pub fn owner_of(&self, path: &ResolvedPath) -> QueryResult<&EntitySchema> {
        Ok(self
            .walk(path)?
            .last()
            .map(|(_, entity)| *entity)
            .unwrap_or_else(|| self.root()))
    }
}

impl FieldTypeLookup for Schema {
    fn type_of(&self, path: &ResolvedPath) -> QueryResult<FieldType> {
        let owner = self.owner_of(path)?;
        owner
            .fields
            .get(&path.field)
            .cloned()
            .ok_or_else(|| QueryError::UnknownField {
                key: path.to_string(),
                segment: path.field.clone(),
            })
    }
}
