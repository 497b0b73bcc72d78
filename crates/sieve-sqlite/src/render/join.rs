//! Table aliases and JOIN clauses for key paths.
//!
//! The root entity's table is always `t0`. Every distinct relation chain
//! (`dept`, `dept.addr`, …) gets the next alias the first time a key path
//! walks it, joined with that key path's join kind. Later paths over the
//! same chain reuse the alias whatever their separator.

use crate::error::{SqliteError, SqliteResult};
use once_cell::sync::Lazy;
use regex::Regex;
use sieve_query::{FieldTypeLookup, JoinKind, ResolvedPath, Schema};
use std::collections::HashMap;

static IDENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

/// Reject names that would need quoting
pub(crate) fn identifier(name: &str) -> SqliteResult<&str> {
    if IDENT_RE.is_match(name) {
        Ok(name)
    } else {
        Err(SqliteError::InvalidIdentifier(name.to_string()))
    }
}

pub(crate) fn join_keyword(kind: JoinKind) -> &'static str {
    match kind {
        JoinKind::Inner => "INNER JOIN",
        JoinKind::Left => "LEFT JOIN",
        JoinKind::Right => "RIGHT JOIN",
    }
}

const ROOT_ALIAS: &str = "t0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedJoin {
    pub kind: JoinKind,
    pub table: String,
    pub alias: String,
    /// `ON` condition
    pub condition: String,
}

impl PlannedJoin {
    fn to_sql(&self) -> String {
        format!(
            "{} {} {} ON {}",
            join_keyword(self.kind),
            self.table,
            self.alias,
            self.condition
        )
    }
}

/// Joins needed by the key paths of one query.
#[derive(Debug)]
pub struct JoinPlan<'s> {
    schema: &'s Schema,
    root_table: &'s str,
    joins: Vec<PlannedJoin>,
    aliases: HashMap<Vec<String>, String>,
}

impl<'s> JoinPlan<'s> {
    pub fn new(schema: &'s Schema) -> SqliteResult<Self> {
        Ok(Self {
            schema,
            root_table: identifier(&schema.root().table)?,
            joins: Vec::new(),
            aliases: HashMap::new(),
        })
    }

    /// Qualified column (`t2.city`) for `path`, planning any joins it needs
    pub fn column(&mut self, path: &ResolvedPath) -> SqliteResult<String> {
        self.schema.type_of(path)?;
        let hops = self.schema.walk(path)?;

        let mut parent = ROOT_ALIAS.to_string();
        let mut chain = Vec::with_capacity(hops.len());

        for (join, (relation, entity)) in path.joins.iter().zip(hops) {
            chain.push(join.relation.clone());
            let alias = match self.aliases.get(&chain) {
                Some(alias) => alias.clone(),
                None => {
                    let alias = format!("t{}", self.joins.len() + 1);
                    let condition = format!(
                        "{}.{} = {}.{}",
                        alias,
                        identifier(&relation.foreign_column)?,
                        parent,
                        identifier(&relation.local_column)?
                    );
                    self.joins.push(PlannedJoin {
                        kind: join.kind,
                        table: identifier(&entity.table)?.to_string(),
                        alias: alias.clone(),
                        condition,
                    });
                    self.aliases.insert(chain.clone(), alias.clone());
                    alias
                }
            };
            parent = alias;
        }

        Ok(format!("{}.{}", parent, identifier(&path.field)?))
    }

    pub fn joins(&self) -> &[PlannedJoin] {
        &self.joins
    }

    /// `FROM` clause body: root table plus joins in planning order
    pub fn from_clause(&self) -> String {
        let mut from = format!("{} {}", self.root_table, ROOT_ALIAS);
        for join in &self.joins {
            from.push('\n');
            from.push_str(&join.to_sql());
        }
        from
    }
}
