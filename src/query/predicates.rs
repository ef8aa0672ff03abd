//! # Predicate Compiler
//!
//! Walks the filter tree a second time (after the join planner) and turns
//! every leaf into a WHERE predicate.
//!
//! Logical groups are built eagerly: each `_and` / `_or` becomes one
//! `sea_query::Condition` holding the entries of all its sub-filters, and is
//! attached to the enclosing group as a single unit. Groups that end up
//! empty are dropped rather than emitted as `TRUE`/`FALSE`.

use sea_query::{Alias, Cond, Condition, Expr, Query, SelectStatement, SimpleExpr};
use serde_json::Value;

use crate::observability::Logger;

use super::apply::{run_query, FilterCompilation};
use super::column::ResolvedColumn;
use super::errors::{QueryError, QueryResult};
use super::filter::{Comparand, Filter, FilterLeaf, FilterNode, FilterOperator, LogicalOperator};
use super::relations::{relation_info, RelationType};
use super::types::Query as QueryDescription;

/// Compile `filter` and AND it onto the statement's WHERE clause
pub(crate) fn apply_predicates(
    ctx: &mut FilterCompilation<'_>,
    statement: &mut SelectStatement,
    filter: &Filter,
) -> QueryResult<()> {
    let condition = add_entries(ctx, Cond::all(), filter)?;
    if !condition.is_empty() {
        statement.cond_where(condition);
    }
    Ok(())
}

fn new_group(operator: LogicalOperator) -> Condition {
    match operator {
        LogicalOperator::And => Cond::all(),
        LogicalOperator::Or => Cond::any(),
    }
}

/// Add every entry of `filter` to `group`
fn add_entries(ctx: &mut FilterCompilation<'_>, mut group: Condition, filter: &Filter) -> QueryResult<Condition> {
    for node in &filter.nodes {
        match node {
            FilterNode::Logical { operator, children } => {
                if node.matches_everything() {
                    continue;
                }
                let mut nested = new_group(*operator);
                for child in children {
                    nested = add_entries(ctx, nested, child)?;
                }
                if !nested.is_empty() {
                    group = group.add(nested);
                }
            }
            FilterNode::Leaf(leaf) => {
                if let Some(predicate) = compile_leaf(ctx, leaf)? {
                    group = group.add(predicate);
                }
            }
        }
    }
    Ok(group)
}

fn compile_leaf(ctx: &mut FilterCompilation<'_>, leaf: &FilterLeaf) -> QueryResult<Option<SimpleExpr>> {
    let Some(operator) = leaf.operator else {
        return Ok(None);
    };

    if !ctx.sub_query {
        if let Some((_, RelationType::OneToMany)) =
            relation_info(&ctx.schema.relations, ctx.collection, root_field(&leaf.path[0]))
        {
            return decorrelate(ctx, leaf).map(Some);
        }
    }

    let column = resolve_leaf_column(ctx, &leaf.path)?;
    compile_operator(ctx, &column, operator, &leaf.comparand)
}

fn root_field(segment: &str) -> &str {
    super::relations::split_scope(segment).0
}

fn resolve_leaf_column(ctx: &FilterCompilation<'_>, path: &[String]) -> QueryResult<ResolvedColumn> {
    let Some((last, relational)) = path.split_last() else {
        return Err(QueryError::invalid("Filter path is empty"));
    };

    if relational.is_empty() {
        return ResolvedColumn::resolve(ctx.schema, ctx.collection, ctx.collection, last);
    }

    let hops = super::relations::RelationGraph::new(ctx.schema).resolve(ctx.collection, path)?;
    let target = hops
        .last()
        .map(|hop| hop.target.clone())
        .unwrap_or_else(|| ctx.collection.to_string());
    let table = ctx.aliases.lookup_path(relational).ok_or_else(|| {
        QueryError::invalid(format!(
            "\"{}\" cannot be resolved to a joined column",
            path.join(".")
        ))
    })?;

    ResolvedColumn::resolve(ctx.schema, table, &target, last)
}

/// `pk IN (SELECT related.fk FROM related WHERE related.fk IS NOT NULL AND <rest>)`
fn decorrelate(ctx: &mut FilterCompilation<'_>, leaf: &FilterLeaf) -> QueryResult<SimpleExpr> {
    let schema = ctx.schema;
    let dialect = ctx.dialect;
    let collection = ctx.collection;

    let hop = super::relations::RelationGraph::new(schema).hop(collection, &leaf.path[0])?;
    let related = hop.relation.collection.as_str();
    let foreign_key = hop.relation.field.as_str();
    let pk = schema
        .primary_key(collection)
        .ok_or_else(|| QueryError::invalid(format!("Collection \"{}\" does not exist", collection)))?;

    let sub_path = if leaf.path.len() > 1 {
        leaf.path[1..].to_vec()
    } else {
        let related_pk = schema
            .primary_key(related)
            .ok_or_else(|| QueryError::invalid(format!("Collection \"{}\" does not exist", related)))?;
        vec![related_pk.to_string()]
    };

    let sub_filter = Filter::new(vec![FilterNode::Leaf(FilterLeaf {
        path: sub_path,
        operator: leaf.operator,
        comparand: leaf.comparand.clone(),
    })]);

    let mut sub_select = Query::select();
    sub_select
        .column((Alias::new(related), Alias::new(foreign_key)))
        .from(Alias::new(related))
        .and_where(Expr::col((Alias::new(related), Alias::new(foreign_key))).is_not_null());

    run_query(
        &mut *ctx.allocator,
        dialect,
        related,
        &mut sub_select,
        &QueryDescription::new().with_filter(sub_filter),
        schema,
        true,
    )?;

    Logger::trace(
        "FILTER_SUBQUERY_DECORRELATED",
        &[
            ("collection", collection),
            ("field", leaf.path[0].as_str()),
            ("related", related),
        ],
    );

    Ok(Expr::col((Alias::new(collection), Alias::new(pk))).in_subquery(sub_select))
}

fn compile_operator(
    ctx: &FilterCompilation<'_>,
    column: &ResolvedColumn,
    operator: FilterOperator,
    comparand: &Comparand,
) -> QueryResult<Option<SimpleExpr>> {
    if operator.requires_value() && comparand.is_undefined() {
        return Ok(None);
    }

    let dialect = ctx.dialect;
    let numeric = column.is_numeric(ctx.schema);
    let col = column.col(dialect);

    let predicate = match operator {
        FilterOperator::Null => Some(if comparand.is_false() { col.is_not_null() } else { col.is_null() }),
        FilterOperator::Nnull => Some(if comparand.is_false() { col.is_null() } else { col.is_not_null() }),
        FilterOperator::Empty => Some(if comparand.is_false() { col.ne("") } else { col.eq("") }),
        FilterOperator::Nempty => Some(if comparand.is_false() { col.eq("") } else { col.ne("") }),

        FilterOperator::Eq => match comparand {
            Comparand::Value(Value::Null) => Some(col.is_null()),
            Comparand::Value(value) => scalar(value, numeric).map(|v| col.eq(v)),
            _ => None,
        },
        FilterOperator::Neq => match comparand {
            Comparand::Value(Value::Null) => Some(col.is_not_null()),
            Comparand::Value(value) => scalar(value, numeric).map(|v| col.ne(v)),
            _ => None,
        },

        FilterOperator::Lt => single(comparand, numeric).map(|v| col.lt(v)),
        FilterOperator::Lte => single(comparand, numeric).map(|v| col.lte(v)),
        FilterOperator::Gt => single(comparand, numeric).map(|v| col.gt(v)),
        FilterOperator::Gte => single(comparand, numeric).map(|v| col.gte(v)),

        FilterOperator::Contains => text(comparand).map(|t| col.like(format!("%{}%", t))),
        FilterOperator::Ncontains => text(comparand).map(|t| col.not_like(format!("%{}%", t))),
        FilterOperator::StartsWith => text(comparand).map(|t| col.like(format!("{}%", t))),
        FilterOperator::NstartsWith => text(comparand).map(|t| col.not_like(format!("{}%", t))),
        FilterOperator::EndsWith => text(comparand).map(|t| col.like(format!("%{}", t))),
        FilterOperator::NendsWith => text(comparand).map(|t| col.not_like(format!("%{}", t))),

        FilterOperator::In => Some(col.is_in(list(comparand, numeric))),
        FilterOperator::Nin => Some(col.is_not_in(list(comparand, numeric))),
        FilterOperator::Between => pair(comparand, numeric).map(|(a, b)| col.between(a, b)),
        FilterOperator::Nbetween => pair(comparand, numeric).map(|(a, b)| col.not_between(a, b)),

        FilterOperator::Intersects => geometry(comparand)
            .map(|g| Expr::cust_with_values(dialect.intersects(&column.sql(dialect)), [g])),
        FilterOperator::Nintersects => geometry(comparand)
            .map(|g| Expr::cust_with_values(dialect.nintersects(&column.sql(dialect)), [g])),
        FilterOperator::IntersectsBbox => geometry(comparand)
            .map(|g| Expr::cust_with_values(dialect.intersects_bbox(&column.sql(dialect)), [g])),
        FilterOperator::NintersectsBbox => geometry(comparand)
            .map(|g| Expr::cust_with_values(dialect.nintersects_bbox(&column.sql(dialect)), [g])),
    };

    Ok(predicate)
}

/// Convert a JSON scalar to a bound value; numeric strings become numbers on
/// numeric columns
fn scalar(value: &Value, numeric: bool) -> Option<sea_query::Value> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some((*b).into()),
        Value::Number(n) => Some(number(n)),
        Value::String(s) => {
            if numeric {
                if let Some(parsed) = parse_number(s) {
                    return Some(parsed);
                }
            }
            Some(s.clone().into())
        }
        Value::Array(_) | Value::Object(_) => Some(value.to_string().into()),
    }
}

fn number(n: &serde_json::Number) -> sea_query::Value {
    if let Some(i) = n.as_i64() {
        i.into()
    } else if let Some(u) = n.as_u64() {
        u.into()
    } else {
        n.as_f64().unwrap_or_default().into()
    }
}

pub(crate) fn parse_number(text: &str) -> Option<sea_query::Value> {
    let text = text.trim();
    if let Ok(i) = text.parse::<i64>() {
        return Some(i.into());
    }
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() => Some(f.into()),
        _ => None,
    }
}

fn single(comparand: &Comparand, numeric: bool) -> Option<sea_query::Value> {
    match comparand {
        Comparand::Value(value) => scalar(value, numeric),
        _ => None,
    }
}

fn text(comparand: &Comparand) -> Option<String> {
    match comparand {
        Comparand::Value(Value::String(s)) => Some(s.clone()),
        Comparand::Value(Value::Number(n)) => Some(n.to_string()),
        Comparand::Value(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    }
}

/// List comparand: comma strings are split, undefined entries dropped
fn list(comparand: &Comparand, numeric: bool) -> Vec<sea_query::Value> {
    match comparand {
        Comparand::Undefined => Vec::new(),
        Comparand::Value(Value::String(s)) => s
            .split(',')
            .filter_map(|part| scalar(&Value::String(part.to_string()), numeric))
            .collect(),
        Comparand::Value(value) => scalar(value, numeric).into_iter().collect(),
        Comparand::List(items) => items
            .iter()
            .flatten()
            .filter_map(|item| scalar(item, numeric))
            .collect(),
    }
}

fn pair(comparand: &Comparand, numeric: bool) -> Option<(sea_query::Value, sea_query::Value)> {
    let mut values = list(comparand, numeric);
    if values.len() != 2 {
        return None;
    }
    let second = values.pop()?;
    let first = values.pop()?;
    Some((first, second))
}

/// GeoJSON as text, whether given as a string or an object
fn geometry(comparand: &Comparand) -> Option<sea_query::Value> {
    match comparand {
        Comparand::Value(Value::String(s)) => Some(s.clone().into()),
        Comparand::Value(value @ Value::Object(_)) => Some(value.to_string().into()),
        _ => None,
    }
}
