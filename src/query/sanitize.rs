//! # Request Parameter Sanitizer
//!
//! Parses raw request parameters into a [`Query`]:
//!
//! | key | accepted forms |
//! |---|---|
//! | `sort` | `-date_created,title` or a list |
//! | `limit` | integer or numeric string, `-1` for unlimited |
//! | `offset`, `page` | non-negative integers |
//! | `filter` | JSON object or its string encoding |
//! | `search` | string |
//! | `groupBy` / `group` | `a,year(b)` or a list |
//! | `aggregate` | `{"count":"*","sum":["amount"]}` or its string encoding |
//! | `aggregate[op]` | `*` or `a,b` |
//!
//! Values may arrive as strings (query-string style) or as typed JSON.
//! Unknown keys are ignored.

use serde_json::{Map, Value};

use crate::config::CompilerConfig;

use super::errors::{QueryError, QueryResult};
use super::filter::Filter;
use super::types::{Aggregate, AggregateOperation, Query, Sort};
use super::variables::FilterContext;

/// Parse request parameters without request variables
pub fn sanitize_query(params: &Map<String, Value>, config: &CompilerConfig) -> QueryResult<Query> {
    sanitize_query_with(params, config, &FilterContext::default())
}

/// Parse request parameters, resolving `$`-variables in the filter
pub fn sanitize_query_with(
    params: &Map<String, Value>,
    config: &CompilerConfig,
    ctx: &FilterContext,
) -> QueryResult<Query> {
    let mut query = Query::new();

    for (key, value) in params {
        match key.as_str() {
            "sort" => query.sort = Some(parse_list("sort", value)?.iter().map(|s| Sort::parse(s)).collect()),
            "limit" => query.limit = Some(parse_integer("limit", value)?),
            "offset" => query.offset = Some(parse_unsigned("offset", value)?),
            "page" => {
                let page = parse_unsigned("page", value)?;
                if page == 0 {
                    return Err(QueryError::invalid("page must be 1 or greater"));
                }
                query.page = Some(page);
            }
            "filter" => query.filter = Some(Filter::parse_with(&parse_embedded_json("filter", value)?, ctx)?),
            "search" => query.search = Some(parse_string("search", value)?),
            "groupBy" | "group" => query.group = Some(parse_list(key, value)?),
            "aggregate" => {
                let aggregate = parse_aggregate(&parse_embedded_json("aggregate", value)?)?;
                merge_aggregate(&mut query, aggregate);
            }
            other => {
                if let Some(name) = other.strip_prefix("aggregate[").and_then(|s| s.strip_suffix(']')) {
                    let operation = aggregate_operation(name)?;
                    let fields = parse_list(key, value)?;
                    merge_aggregate(&mut query, Aggregate::from([(operation, fields)]));
                }
            }
        }
    }

    query.limit = Some(check_limit(query.limit.unwrap_or(config.default_limit), config)?);
    Ok(query)
}

fn check_limit(limit: i64, config: &CompilerConfig) -> QueryResult<i64> {
    if limit < -1 {
        return Err(QueryError::invalid(format!("Invalid limit: {}", limit)));
    }
    if config.max_limit != -1 && (limit == -1 || limit > config.max_limit) {
        return Err(QueryError::invalid(format!(
            "limit {} exceeds the maximum of {}",
            limit, config.max_limit
        )));
    }
    Ok(limit)
}

fn merge_aggregate(query: &mut Query, aggregate: Aggregate) {
    let target = query.aggregate.get_or_insert_with(Aggregate::new);
    for (operation, fields) in aggregate {
        let entry = target.entry(operation).or_default();
        for field in fields {
            if !entry.contains(&field) {
                entry.push(field);
            }
        }
    }
}

fn aggregate_operation(name: &str) -> QueryResult<AggregateOperation> {
    AggregateOperation::from_name(name)
        .ok_or_else(|| QueryError::invalid(format!("\"{}\" is not a supported aggregate function", name)))
}

fn parse_aggregate(value: &Value) -> QueryResult<Aggregate> {
    let Value::Object(map) = value else {
        return Err(QueryError::invalid("aggregate must be an object"));
    };

    let mut aggregate = Aggregate::new();
    for (name, fields) in map {
        aggregate.insert(aggregate_operation(name)?, parse_list("aggregate", fields)?);
    }
    Ok(aggregate)
}

/// Objects pass through; strings are decoded as JSON
fn parse_embedded_json(key: &str, value: &Value) -> QueryResult<Value> {
    match value {
        Value::String(text) => serde_json::from_str(text)
            .map_err(|e| QueryError::invalid(format!("{} is not valid JSON: {}", key, e))),
        other => Ok(other.clone()),
    }
}

fn parse_string(key: &str, value: &Value) -> QueryResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(QueryError::invalid(format!("{} must be a string", key))),
    }
}

/// Comma-separated string or list of strings, empty entries dropped
fn parse_list(key: &str, value: &Value) -> QueryResult<Vec<String>> {
    let items: Vec<String> = match value {
        Value::String(s) => s.split(',').map(|part| part.trim().to_string()).collect(),
        Value::Array(items) => items
            .iter()
            .map(|item| parse_string(key, item).map(|s| s.trim().to_string()))
            .collect::<QueryResult<_>>()?,
        _ => return Err(QueryError::invalid(format!("{} must be a string or a list", key))),
    };

    Ok(items.into_iter().filter(|s| !s.is_empty()).collect())
}

fn parse_integer(key: &str, value: &Value) -> QueryResult<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| QueryError::invalid(format!("Invalid {}: {}", key, value)))
}

fn parse_unsigned(key: &str, value: &Value) -> QueryResult<u64> {
    let parsed = parse_integer(key, value)?;
    u64::try_from(parsed).map_err(|_| QueryError::invalid(format!("Invalid {}: {}", key, value)))
}
