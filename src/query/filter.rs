//! # Filter Expression AST
//!
//! Filters arrive as loosely-typed JSON:
//!
//! ```json
//! { "_or": [ { "status": { "_eq": "draft" } }, { "author": { "name": { "_contains": "ann" } } } ] }
//! ```
//!
//! and are parsed once into a tagged tree that the join planner and the
//! predicate compiler both walk. Each leaf carries the full relation path,
//! exactly one operator, and its comparand.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::observability::Logger;

use super::errors::{QueryError, QueryResult};
use super::variables::FilterContext;

/// Leaf filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Nin,
    Null,
    Nnull,
    Contains,
    Ncontains,
    StartsWith,
    NstartsWith,
    EndsWith,
    NendsWith,
    Between,
    Nbetween,
    Empty,
    Nempty,
    Intersects,
    Nintersects,
    IntersectsBbox,
    NintersectsBbox,
}

impl FilterOperator {
    /// Parse an operator key such as `_starts_with`
    pub fn from_key(key: &str) -> Option<Self> {
        let op = match key {
            "_eq" => FilterOperator::Eq,
            "_neq" => FilterOperator::Neq,
            "_lt" => FilterOperator::Lt,
            "_lte" => FilterOperator::Lte,
            "_gt" => FilterOperator::Gt,
            "_gte" => FilterOperator::Gte,
            "_in" => FilterOperator::In,
            "_nin" => FilterOperator::Nin,
            "_null" => FilterOperator::Null,
            "_nnull" => FilterOperator::Nnull,
            "_contains" => FilterOperator::Contains,
            "_ncontains" => FilterOperator::Ncontains,
            "_starts_with" => FilterOperator::StartsWith,
            "_nstarts_with" => FilterOperator::NstartsWith,
            "_ends_with" => FilterOperator::EndsWith,
            "_nends_with" => FilterOperator::NendsWith,
            "_between" => FilterOperator::Between,
            "_nbetween" => FilterOperator::Nbetween,
            "_empty" => FilterOperator::Empty,
            "_nempty" => FilterOperator::Nempty,
            "_intersects" => FilterOperator::Intersects,
            "_nintersects" => FilterOperator::Nintersects,
            "_intersects_bbox" => FilterOperator::IntersectsBbox,
            "_nintersects_bbox" => FilterOperator::NintersectsBbox,
            _ => return None,
        };
        Some(op)
    }

    /// Get the operator key representation
    pub fn as_key(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "_eq",
            FilterOperator::Neq => "_neq",
            FilterOperator::Lt => "_lt",
            FilterOperator::Lte => "_lte",
            FilterOperator::Gt => "_gt",
            FilterOperator::Gte => "_gte",
            FilterOperator::In => "_in",
            FilterOperator::Nin => "_nin",
            FilterOperator::Null => "_null",
            FilterOperator::Nnull => "_nnull",
            FilterOperator::Contains => "_contains",
            FilterOperator::Ncontains => "_ncontains",
            FilterOperator::StartsWith => "_starts_with",
            FilterOperator::NstartsWith => "_nstarts_with",
            FilterOperator::EndsWith => "_ends_with",
            FilterOperator::NendsWith => "_nends_with",
            FilterOperator::Between => "_between",
            FilterOperator::Nbetween => "_nbetween",
            FilterOperator::Empty => "_empty",
            FilterOperator::Nempty => "_nempty",
            FilterOperator::Intersects => "_intersects",
            FilterOperator::Nintersects => "_nintersects",
            FilterOperator::IntersectsBbox => "_intersects_bbox",
            FilterOperator::NintersectsBbox => "_nintersects_bbox",
        }
    }

    /// Null and empty checks work without a comparand
    pub fn requires_value(&self) -> bool {
        !matches!(
            self,
            FilterOperator::Null | FilterOperator::Nnull | FilterOperator::Empty | FilterOperator::Nempty
        )
    }
}

/// Logical combinators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    pub fn as_key(&self) -> &'static str {
        match self {
            LogicalOperator::And => "_and",
            LogicalOperator::Or => "_or",
        }
    }
}

/// Value compared against a column.
///
/// `Undefined` is distinct from JSON `null`: it marks a comparand that was
/// never supplied, and any operator needing a value skips such a leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparand {
    Undefined,
    Value(Value),
    /// List comparand; `None` entries are undefined and dropped at compile time
    List(Vec<Option<Value>>),
}

impl Comparand {
    fn from_json(value: &Value, ctx: &FilterContext) -> Self {
        match value {
            Value::Array(items) => Comparand::List(items.iter().map(|v| ctx.resolve(v)).collect()),
            other => match ctx.resolve(other) {
                Some(resolved) => Comparand::Value(resolved),
                None => Comparand::Undefined,
            },
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Comparand::Undefined)
    }

    /// `false` when the comparand is literally the boolean false
    pub fn is_false(&self) -> bool {
        matches!(self, Comparand::Value(Value::Bool(false)))
    }
}

impl From<Value> for Comparand {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Comparand::List(items.into_iter().map(Some).collect()),
            other => Comparand::Value(other),
        }
    }
}

/// A single `path operator comparand` condition
#[derive(Debug, Clone, PartialEq)]
pub struct FilterLeaf {
    /// Relation path ending in the filtered field, e.g. `["author", "name"]`
    pub path: Vec<String>,
    /// `None` for an unrecognized `_` key; such leaves compile to nothing
    pub operator: Option<FilterOperator>,
    pub comparand: Comparand,
}

impl FilterLeaf {
    pub fn new(path: Vec<String>, operator: FilterOperator, comparand: impl Into<Comparand>) -> Self {
        Self {
            path,
            operator: Some(operator),
            comparand: comparand.into(),
        }
    }
}

/// One entry of a filter object
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Logical {
        operator: LogicalOperator,
        children: Vec<Filter>,
    },
    Leaf(FilterLeaf),
}

impl FilterNode {
    /// An `_or` with an empty child matches everything and is skipped whole
    pub fn matches_everything(&self) -> bool {
        match self {
            FilterNode::Logical {
                operator: LogicalOperator::Or,
                children,
            } => children.iter().any(Filter::is_empty),
            _ => false,
        }
    }
}

/// A parsed filter object: its entries are combined with the enclosing logic
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub nodes: Vec<FilterNode>,
}

impl Filter {
    pub fn new(nodes: Vec<FilterNode>) -> Self {
        Self { nodes }
    }

    /// A filter holding a single leaf
    pub fn leaf(path: &[&str], operator: FilterOperator, comparand: impl Into<Comparand>) -> Self {
        Self::new(vec![FilterNode::Leaf(FilterLeaf::new(
            path.iter().map(|s| s.to_string()).collect(),
            operator,
            comparand,
        ))])
    }

    pub fn and(children: Vec<Filter>) -> Self {
        Self::new(vec![FilterNode::Logical {
            operator: LogicalOperator::And,
            children,
        }])
    }

    pub fn or(children: Vec<Filter>) -> Self {
        Self::new(vec![FilterNode::Logical {
            operator: LogicalOperator::Or,
            children,
        }])
    }

    /// `{}`: the permission-system "match everything" filter
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parse a JSON filter without request variables
    pub fn parse(value: &Value) -> QueryResult<Self> {
        Self::parse_with(value, &FilterContext::default())
    }

    /// Parse a JSON filter, substituting `$`-variables from `ctx`
    pub fn parse_with(value: &Value, ctx: &FilterContext) -> QueryResult<Self> {
        match value {
            Value::Object(map) => parse_object(map, ctx),
            other => Err(QueryError::invalid(format!(
                "Filter must be an object, got {}",
                json_kind(other)
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Filter::parse(&value).map_err(|e| serde::de::Error::custom(e.reason().to_string()))
    }
}

fn parse_object(map: &Map<String, Value>, ctx: &FilterContext) -> QueryResult<Filter> {
    let mut nodes = Vec::with_capacity(map.len());

    for (key, value) in map {
        let node = match key.as_str() {
            "_and" => parse_logical(LogicalOperator::And, value, ctx)?,
            "_or" => parse_logical(LogicalOperator::Or, value, ctx)?,
            operator if operator.starts_with('_') => {
                return Err(QueryError::invalid(format!(
                    "Operator \"{}\" must be nested under a field",
                    operator
                )));
            }
            _ => FilterNode::Leaf(parse_leaf(key, value, ctx)?),
        };
        nodes.push(node);
    }

    Ok(Filter::new(nodes))
}

fn parse_logical(operator: LogicalOperator, value: &Value, ctx: &FilterContext) -> QueryResult<FilterNode> {
    let Value::Array(items) = value else {
        return Err(QueryError::invalid(format!(
            "\"{}\" expects a list of filters",
            operator.as_key()
        )));
    };

    let children = items
        .iter()
        .map(|item| match item {
            Value::Object(map) => parse_object(map, ctx),
            other => Err(QueryError::invalid(format!(
                "\"{}\" entries must be objects, got {}",
                operator.as_key(),
                json_kind(other)
            ))),
        })
        .collect::<QueryResult<Vec<_>>>()?;

    Ok(FilterNode::Logical { operator, children })
}

/// Follow the first key of each nested object until an operator is reached.
///
/// A non-object value is an implicit `_eq`. Unknown `_` keys still end the
/// path but carry no operator.
fn parse_leaf(key: &str, value: &Value, ctx: &FilterContext) -> QueryResult<FilterLeaf> {
    let mut path = vec![key.to_string()];
    let mut current = value;

    loop {
        let map = match current {
            Value::Object(map) => map,
            other => {
                return Ok(FilterLeaf {
                    path,
                    operator: Some(FilterOperator::Eq),
                    comparand: Comparand::from_json(other, ctx),
                });
            }
        };

        let Some((next_key, next_value)) = map.iter().next() else {
            return Err(QueryError::invalid(format!(
                "Filter for \"{}\" is empty",
                path.join(".")
            )));
        };

        if next_key == "_and" || next_key == "_or" {
            return Err(QueryError::invalid(format!(
                "\"{}\" is only allowed at the top of a filter or inside another logical group (found under \"{}\")",
                next_key,
                path.join(".")
            )));
        }

        if next_key.starts_with('_') {
            let operator = FilterOperator::from_key(next_key);
            if operator.is_none() {
                let field = path.join(".");
                Logger::trace(
                    "FILTER_OPERATOR_SKIPPED",
                    &[("field", field.as_str()), ("operator", next_key.as_str())],
                );
            }
            return Ok(FilterLeaf {
                path,
                operator,
                comparand: Comparand::from_json(next_value, ctx),
            });
        }

        path.push(next_key.clone());
        current = next_value;
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
