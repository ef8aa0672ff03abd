//! CLI command implementations
//!
//! `compile` accepts either a query description or raw request parameters:
//!
//! ```json
//! { "filter": { "author": { "name": { "_eq": "Ann" } } }, "limit": 10 }
//! { "params": { "filter": "{\"status\":{\"_eq\":\"draft\"}}", "sort": "-id" },
//!   "context": { "user": "u-1" } }
//! ```

use std::path::Path;

use serde_json::{json, Map, Value};

use crate::config::CompilerConfig;
use crate::observability::{Logger, Severity};
use crate::query::{sanitize_query_with, FilterContext, Query, QueryCompiler};
use crate::schema::SchemaOverview;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_error, write_response};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command, cli.verbose)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command, verbose: bool) -> CliResult<()> {
    match cmd {
        Command::Compile {
            config,
            collection,
            alias_seed,
        } => compile(&config, &collection, alias_seed, verbose),
        Command::Validate { config } => validate(&config, verbose),
    }
}

/// Load config, set the log level, and load the schema it points at
fn boot(config_path: &Path, verbose: bool) -> CliResult<(CompilerConfig, SchemaOverview)> {
    let config = CompilerConfig::load(config_path)?;

    let severity = if verbose { Severity::Trace } else { config.severity()? };
    Logger::set_min_severity(severity);

    let schema = SchemaOverview::load(&config.schema_path)?;
    Ok((config, schema))
}

/// Compile a single request read from stdin
pub fn compile(config_path: &Path, collection: &str, alias_seed: Option<u64>, verbose: bool) -> CliResult<()> {
    let (config, schema) = boot(config_path, verbose)?;
    let request = read_request()?;

    match compile_request(&config, &schema, collection, &request, alias_seed) {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Check the schema overview for dangling relations
pub fn validate(config_path: &Path, verbose: bool) -> CliResult<()> {
    let (_, schema) = boot(config_path, verbose)?;
    write_response(validate_schema(&schema)?)
}

pub(crate) fn validate_schema(schema: &SchemaOverview) -> CliResult<Value> {
    schema.validate().map_err(CliError::schema_error)?;
    Ok(json!({
        "collections": schema.collections.len(),
        "relations": schema.relations.len(),
    }))
}

/// Turn one request document into `{sql, bindings, inline}`
pub(crate) fn compile_request(
    config: &CompilerConfig,
    schema: &SchemaOverview,
    collection: &str,
    request: &Value,
    alias_seed: Option<u64>,
) -> CliResult<Value> {
    let query = request_query(config, request)?;

    let mut compiler = QueryCompiler::new(schema, config.dialect);
    if let Some(seed) = alias_seed {
        compiler = compiler.with_alias_seed(seed);
    }
    let compiled = compiler.compile_select(collection, &query)?;

    let bindings: Vec<Value> = compiled.bindings.0.iter().map(binding_to_json).collect();

    Ok(json!({
        "sql": compiled.sql,
        "bindings": bindings,
        "inline": compiled.inline,
    }))
}

fn request_query(config: &CompilerConfig, request: &Value) -> CliResult<Query> {
    let Value::Object(object) = request else {
        return Err(CliError::invalid_query("Request must be a JSON object"));
    };

    match object.get("params") {
        Some(Value::Object(params)) => {
            let ctx = request_context(object.get("context"))?;
            Ok(sanitize_query_with(params, config, &ctx)?)
        }
        Some(_) => Err(CliError::invalid_query("params must be an object")),
        None => serde_json::from_value(request.clone()).map_err(|e| CliError::invalid_query(e.to_string())),
    }
}

fn request_context(context: Option<&Value>) -> CliResult<FilterContext> {
    let mut ctx = FilterContext::new();
    let Some(context) = context else {
        return Ok(ctx);
    };

    let object: &Map<String, Value> = context
        .as_object()
        .ok_or_else(|| CliError::invalid_query("context must be an object"))?;

    if let Some(user) = object.get("user").and_then(Value::as_str) {
        ctx = ctx.with_user(user);
    }
    if let Some(role) = object.get("role").and_then(Value::as_str) {
        ctx = ctx.with_role(role);
    }
    Ok(ctx)
}

fn binding_to_json(value: &sea_query::Value) -> Value {
    use sea_query::Value as V;

    match value {
        V::Bool(v) => json!(v),
        V::TinyInt(v) => json!(v),
        V::SmallInt(v) => json!(v),
        V::Int(v) => json!(v),
        V::BigInt(v) => json!(v),
        V::TinyUnsigned(v) => json!(v),
        V::SmallUnsigned(v) => json!(v),
        V::Unsigned(v) => json!(v),
        V::BigUnsigned(v) => json!(v),
        V::Float(v) => json!(v),
        V::Double(v) => json!(v),
        V::String(v) => json!(v.as_deref()),
        V::Char(v) => json!(v.map(|c| c.to_string())),
        other => Value::String(format!("{:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CollectionOverview, FieldType, Relation};

    fn schema() -> SchemaOverview {
        SchemaOverview::new()
            .with_collection(
                "articles",
                CollectionOverview::new("id")
                    .with_field("id", FieldType::Integer)
                    .with_field("status", FieldType::String)
                    .with_field("owner", FieldType::String)
                    .with_field("author", FieldType::Integer),
            )
            .with_collection(
                "users",
                CollectionOverview::new("id")
                    .with_field("id", FieldType::Integer)
                    .with_field("name", FieldType::String),
            )
            .with_relation(Relation::many_to_one("articles", "author", "users"))
    }

    #[test]
    fn test_compile_query_description() {
        let data = compile_request(
            &CompilerConfig::default(),
            &schema(),
            "articles",
            &json!({ "filter": { "status": { "_eq": "draft" } }, "limit": 5 }),
            Some(1),
        )
        .unwrap();

        assert!(data["sql"].as_str().unwrap().contains("WHERE \"articles\".\"status\" = $1"));
        assert_eq!(data["bindings"][0], json!("draft"));
        assert!(data["inline"].as_str().unwrap().contains("'draft'"));
    }

    #[test]
    fn test_compile_params_apply_default_limit() {
        let data = compile_request(
            &CompilerConfig::default(),
            &schema(),
            "articles",
            &json!({
                "params": { "filter": "{\"owner\":{\"_eq\":\"$CURRENT_USER\"}}" },
                "context": { "user": "u-9" }
            }),
            None,
        )
        .unwrap();

        let bindings = data["bindings"].as_array().unwrap();
        assert!(bindings.contains(&json!("u-9")));
        assert!(bindings.contains(&json!(100)));
    }

    #[test]
    fn test_compile_reports_invalid_query() {
        let err = compile_request(
            &CompilerConfig::default(),
            &schema(),
            "articles",
            &json!({ "filter": { "status": { "name": { "_eq": "x" } } } }),
            None,
        )
        .unwrap_err();

        assert_eq!(err.code_str(), "RELQUERY_INVALID_QUERY");
        assert!(err.message().contains("is not a relational field"));
    }

    #[test]
    fn test_validate_schema_counts() {
        let data = validate_schema(&schema()).unwrap();
        assert_eq!(data, json!({ "collections": 2, "relations": 1 }));
    }

    #[test]
    fn test_validate_schema_rejects_dangling() {
        let schema = schema().with_relation(Relation::many_to_one("articles", "editor", "editors"));
        assert_eq!(validate_schema(&schema).unwrap_err().code_str(), "RELQUERY_SCHEMA_ERROR");
    }

    #[test]
    fn test_binding_to_json() {
        assert_eq!(binding_to_json(&sea_query::Value::from(3i64)), json!(3));
        assert_eq!(binding_to_json(&sea_query::Value::from("a".to_string())), json!("a"));
        assert_eq!(binding_to_json(&sea_query::Value::from(true)), json!(true));
    }
}
