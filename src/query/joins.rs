//! # Join Planner
//!
//! Walks the filter tree and emits one `LEFT JOIN` per relation hop of every
//! multi-segment leaf path. Hops already joined from the same parent are
//! reused through the alias map.
//!
//! A one-to-many hop at the root of a top-level query is never joined (the
//! join would duplicate parent rows); the predicate compiler turns such leaves
//! into `pk IN (SELECT ...)` instead, and the walk stops there.

use sea_query::{Alias, Cond, Condition, Expr, JoinType, SelectStatement};

use crate::observability::Logger;

use super::apply::FilterCompilation;
use super::errors::{QueryError, QueryResult};
use super::filter::{Filter, FilterNode};
use super::relations::{RelationGraph, RelationHop, RelationType};

/// Add joins for every relational leaf in `filter`
pub(crate) fn plan_joins(
    ctx: &mut FilterCompilation<'_>,
    statement: &mut SelectStatement,
    filter: &Filter,
) -> QueryResult<()> {
    for node in &filter.nodes {
        match node {
            FilterNode::Logical { children, .. } => {
                if node.matches_everything() {
                    continue;
                }
                for child in children {
                    plan_joins(ctx, statement, child)?;
                }
            }
            FilterNode::Leaf(leaf) => {
                if leaf.operator.is_some() && leaf.path.len() > 1 {
                    join_path(ctx, statement, &leaf.path)?;
                }
            }
        }
    }
    Ok(())
}

/// Join every relational hop of `path` (all segments but the last)
pub(crate) fn join_path(
    ctx: &mut FilterCompilation<'_>,
    statement: &mut SelectStatement,
    path: &[String],
) -> QueryResult<()> {
    let graph = RelationGraph::new(ctx.schema);
    let mut collection = ctx.collection.to_string();
    let mut parent_alias: Option<String> = None;

    for (index, segment) in path.iter().take(path.len().saturating_sub(1)).enumerate() {
        let hop = graph.hop(&collection, segment)?;

        if let Some(existing) = ctx.aliases.get(parent_alias.as_deref(), segment) {
            parent_alias = Some(existing.to_string());
            collection = hop.target;
            continue;
        }

        if hop.relation_type == RelationType::OneToMany && index == 0 && !ctx.sub_query {
            return Ok(());
        }

        let parent_table = parent_alias.clone().unwrap_or_else(|| ctx.collection.to_string());
        let alias = ctx.allocator.allocate();
        let on = join_condition(ctx, &hop, &parent_table, &alias)?;

        statement.join_as(
            JoinType::LeftJoin,
            Alias::new(hop.target.as_str()),
            Alias::new(alias.as_str()),
            on,
        );
        ctx.aliases.insert(parent_alias.as_deref(), segment, alias.clone());

        Logger::trace(
            "FILTER_JOIN_ADDED",
            &[
                ("alias", alias.as_str()),
                ("collection", hop.target.as_str()),
                ("relation", hop.relation_type.as_str()),
                ("segment", segment.as_str()),
            ],
        );

        parent_alias = Some(alias);
        collection = hop.target;
    }

    Ok(())
}

fn join_condition(
    ctx: &FilterCompilation<'_>,
    hop: &RelationHop<'_>,
    parent: &str,
    alias: &str,
) -> QueryResult<Condition> {
    let relation = hop.relation;

    let condition = match hop.relation_type {
        RelationType::ManyToOne => {
            let pk = primary_key(ctx, &hop.target)?;
            Cond::all().add(
                Expr::col((Alias::new(parent), Alias::new(relation.field.as_str())))
                    .equals((Alias::new(alias), Alias::new(pk))),
            )
        }
        RelationType::ManyToAny => {
            let pk = primary_key(ctx, &hop.target)?;
            let discriminator = relation.one_collection_field().ok_or_else(|| {
                QueryError::invalid(format!(
                    "Many-to-any relation \"{}.{}\" has no collection field",
                    relation.collection, relation.field
                ))
            })?;
            let key_as_text = ctx.dialect.cast_to_text(&ctx.dialect.quote_column(alias, pk));

            Cond::all()
                .add(Expr::col((Alias::new(parent), Alias::new(discriminator))).eq(hop.target.as_str()))
                .add(
                    Expr::col((Alias::new(parent), Alias::new(relation.field.as_str())))
                        .eq(Expr::cust(key_as_text)),
                )
        }
        RelationType::OneToMany => {
            let pk = primary_key(ctx, &hop.source)?;
            Cond::all().add(
                Expr::col((Alias::new(parent), Alias::new(pk)))
                    .equals((Alias::new(alias), Alias::new(relation.field.as_str()))),
            )
        }
    };

    Ok(condition)
}

fn primary_key<'s>(ctx: &FilterCompilation<'s>, collection: &str) -> QueryResult<&'s str> {
    ctx.schema
        .primary_key(collection)
        .ok_or_else(|| QueryError::invalid(format!("Collection \"{}\" does not exist", collection)))
}
