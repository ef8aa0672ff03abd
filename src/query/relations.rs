//! # Relation Graph Resolver
//!
//! Resolves filter path segments into typed relation hops.
//!
//! A segment matches a relation either forward (`collection.field` holds the
//! foreign key) or in reverse (`related_collection` exposes it through
//! `meta.one_field`). The relation type is derived from which side matched:
//!
//! | match | related_collection | type |
//! |---|---|---|
//! | forward | present | many-to-one |
//! | forward | absent | many-to-any (target = `:scope` suffix) |
//! | reverse | - | one-to-many |

use crate::schema::{Relation, SchemaOverview};

use super::errors::{QueryError, QueryResult};

/// Derived relation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationType {
    ManyToOne,
    OneToMany,
    ManyToAny,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::ManyToOne => "m2o",
            RelationType::OneToMany => "o2m",
            RelationType::ManyToAny => "m2a",
        }
    }
}

/// One resolved step along a relation path
#[derive(Debug, Clone, PartialEq)]
pub struct RelationHop<'a> {
    pub relation: &'a Relation,
    pub relation_type: RelationType,
    /// Segment as written, including any `:scope` suffix
    pub segment: String,
    /// Collection the hop starts from
    pub source: String,
    /// Collection the hop lands in
    pub target: String,
}

/// Split `field:scope` into the field and optional scope
pub fn split_scope(segment: &str) -> (&str, Option<&str>) {
    match segment.split_once(':') {
        Some((field, scope)) if !scope.is_empty() => (field, Some(scope)),
        Some((field, _)) => (field, None),
        None => (segment, None),
    }
}

/// Find the relation a field of `collection` refers to, and its type
pub fn relation_info<'a>(
    relations: &'a [Relation],
    collection: &str,
    field: &str,
) -> Option<(&'a Relation, RelationType)> {
    let relation = relations.iter().find(|relation| {
        (relation.collection == collection && relation.field == field)
            || (relation.related_collection.as_deref() == Some(collection)
                && relation.one_field() == Some(field))
    })?;

    let relation_type = if relation.collection == collection && relation.field == field {
        if relation.related_collection.is_some() {
            RelationType::ManyToOne
        } else {
            RelationType::ManyToAny
        }
    } else {
        RelationType::OneToMany
    };

    Some((relation, relation_type))
}

/// Read-only view over the schema's relations
#[derive(Debug, Clone, Copy)]
pub struct RelationGraph<'a> {
    schema: &'a SchemaOverview,
}

impl<'a> RelationGraph<'a> {
    pub fn new(schema: &'a SchemaOverview) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'a SchemaOverview {
        self.schema
    }

    /// Relation and type for a segment, ignoring any `:scope` suffix
    pub fn relation_info(&self, collection: &str, segment: &str) -> Option<(&'a Relation, RelationType)> {
        let (field, _) = split_scope(segment);
        relation_info(&self.schema.relations, collection, field)
    }

    /// Resolve a single segment starting at `collection`
    pub fn hop(&self, collection: &str, segment: &str) -> QueryResult<RelationHop<'a>> {
        let (relation, relation_type) = self.relation_info(collection, segment).ok_or_else(|| {
            QueryError::invalid(format!(
                "\"{}.{}\" is not a relational field",
                collection,
                split_scope(segment).0
            ))
        })?;

        let target = match relation_type {
            RelationType::ManyToOne => relation.related_collection.clone().unwrap_or_default(),
            RelationType::OneToMany => relation.collection.clone(),
            RelationType::ManyToAny => self.many_to_any_target(relation, segment)?,
        };

        if self.schema.collection(&target).is_none() {
            return Err(QueryError::invalid(format!(
                "Collection \"{}\" referenced by \"{}.{}\" does not exist",
                target,
                collection,
                split_scope(segment).0
            )));
        }

        Ok(RelationHop {
            relation,
            relation_type,
            segment: segment.to_string(),
            source: collection.to_string(),
            target,
        })
    }

    fn many_to_any_target(&self, relation: &Relation, segment: &str) -> QueryResult<String> {
        let (field, scope) = split_scope(segment);
        let scope = scope.ok_or_else(|| {
            QueryError::invalid(format!(
                "You have to provide a collection scope when filtering on the many-to-any item \"{}.{}\", e.g. \"{}:<collection>\"",
                relation.collection, field, field
            ))
        })?;

        if relation.one_collection_field().is_none() {
            return Err(QueryError::invalid(format!(
                "Many-to-any relation \"{}.{}\" has no collection field",
                relation.collection, field
            )));
        }

        if let Some(allowed) = relation.one_allowed_collections() {
            if !allowed.iter().any(|c| c == scope) {
                return Err(QueryError::invalid(format!(
                    "Collection \"{}\" is not allowed for \"{}.{}\"",
                    scope, relation.collection, field
                )));
            }
        }

        Ok(scope.to_string())
    }

    /// Resolve every relational segment of `path` (all but the final field)
    pub fn resolve(&self, collection: &str, path: &[String]) -> QueryResult<Vec<RelationHop<'a>>> {
        let mut hops = Vec::with_capacity(path.len().saturating_sub(1));
        let mut current = collection.to_string();

        for segment in path.iter().take(path.len().saturating_sub(1)) {
            let hop = self.hop(&current, segment)?;
            current = hop.target.clone();
            hops.push(hop);
        }

        Ok(hops)
    }
}
