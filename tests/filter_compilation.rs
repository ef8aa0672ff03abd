//! Filter compilation tests
//!
//! Test Categories:
//! 1. Undefined comparands
//! 2. Relation joins and alias reuse
//! 3. Many-to-any scoping
//! 4. One-to-many decorrelation
//! 5. Comma-separated list comparands
//! 6. Permission-style empty filters

use relquery::dialect::Dialect;
use relquery::query::{apply_filter, apply_query, Filter, FilterContext, Query, QueryCompiler};
use relquery::schema::SchemaOverview;
use sea_query::{Alias, Query as Select, SelectStatement, Values};
use serde_json::{json, Value};

fn blog_schema() -> SchemaOverview {
    SchemaOverview::from_json_str(
        &json!({
            "collections": {
                "articles": {
                    "primary": "id",
                    "fields": {
                        "id": { "type": "integer" },
                        "title": { "type": "string" },
                        "views": { "type": "integer" },
                        "rating": { "type": "float" },
                        "author": { "type": "integer" },
                        "date_created": { "type": "dateTime" },
                        "comments": { "type": "alias" }
                    }
                },
                "users": {
                    "primary": "id",
                    "fields": {
                        "id": { "type": "integer" },
                        "name": { "type": "string" },
                        "company": { "type": "integer" }
                    }
                },
                "companies": {
                    "primary": "id",
                    "fields": {
                        "id": { "type": "integer" },
                        "name": { "type": "string" },
                        "country": { "type": "string" }
                    }
                },
                "comments": {
                    "primary": "id",
                    "fields": {
                        "id": { "type": "integer" },
                        "article": { "type": "integer" },
                        "body": { "type": "text" },
                        "user": { "type": "integer" }
                    }
                },
                "blocks": {
                    "primary": "id",
                    "fields": {
                        "id": { "type": "uuid" },
                        "item": { "type": "string" },
                        "collection": { "type": "string" }
                    }
                }
            },
            "relations": [
                { "collection": "articles", "field": "author", "related_collection": "users" },
                { "collection": "users", "field": "company", "related_collection": "companies" },
                { "collection": "comments", "field": "article", "related_collection": "articles",
                  "meta": { "one_field": "comments" } },
                { "collection": "comments", "field": "user", "related_collection": "users" },
                { "collection": "blocks", "field": "item", "related_collection": null,
                  "meta": { "one_collection_field": "collection",
                            "one_allowed_collections": ["articles", "users"] } }
            ]
        })
        .to_string(),
    )
    .unwrap()
}

fn select(collection: &str) -> SelectStatement {
    let mut statement = Select::select();
    statement.column((Alias::new(collection), Alias::new("id"))).from(Alias::new(collection));
    statement
}

fn compile_filter(collection: &str, filter: Value) -> (String, Values) {
    let schema = blog_schema();
    let filter = Filter::parse(&filter).unwrap();
    let mut statement = select(collection);
    apply_filter(Dialect::Postgres, collection, &mut statement, &filter, &schema, false).unwrap();
    Dialect::Postgres.build(&statement)
}

fn join_alias(sql: &str, table: &str) -> String {
    let marker = format!("LEFT JOIN \"{}\" AS \"", table);
    let rest = sql.split(&marker).nth(1).expect("join present");
    rest[..5].to_string()
}

// =============================================================================
// UNDEFINED COMPARANDS
// =============================================================================

#[test]
fn test_undefined_comparand_emits_no_predicate() {
    for operator in ["_eq", "_neq", "_gt", "_in", "_contains", "_between"] {
        let (sql, values) = compile_filter("articles", json!({ "title": { operator: "$CURRENT_USER" } }));
        assert!(!sql.contains("WHERE"), "operator {} emitted {}", operator, sql);
        assert!(values.0.is_empty());
    }
}

#[test]
fn test_undefined_list_entries_are_dropped() {
    let (_, values) = compile_filter("articles", json!({ "views": { "_in": ["$CURRENT_ROLE", 4] } }));
    assert_eq!(values.0, vec![sea_query::Value::from(4i64)]);
}

#[test]
fn test_variables_resolve_from_context() {
    let schema = blog_schema();
    let ctx = FilterContext::new().with_user("7");
    let filter = Filter::parse_with(&json!({ "author": { "_eq": "$CURRENT_USER" } }), &ctx).unwrap();
    let mut statement = select("articles");
    apply_filter(Dialect::Postgres, "articles", &mut statement, &filter, &schema, false).unwrap();
    let (sql, values) = Dialect::Postgres.build(&statement);
    assert!(sql.contains("\"articles\".\"author\" = $1"));
    assert_eq!(values.0, vec![sea_query::Value::from(7i64)]);
}

#[test]
fn test_unrecognized_operator_only_drops_its_leaf() {
    let (sql, values) = compile_filter(
        "articles",
        json!({ "_or": [ { "title": { "_like": "x" } }, { "title": { "_eq": "a" } } ] }),
    );
    assert!(sql.ends_with("WHERE \"articles\".\"title\" = $1"));
    assert_eq!(values.0.len(), 1);
}

// =============================================================================
// RELATION JOINS
// =============================================================================

#[test]
fn test_multi_hop_join_count_matches_hops() {
    let (sql, _) = compile_filter(
        "comments",
        json!({ "article": { "author": { "company": { "name": { "_eq": "Acme" } } } } }),
    );
    assert_eq!(sql.matches("LEFT JOIN").count(), 3);

    let company = join_alias(&sql, "companies");
    assert!(sql.contains(&format!("WHERE \"{}\".\"name\" = $1", company)));
}

#[test]
fn test_shared_prefix_reuses_aliases() {
    let (sql, _) = compile_filter(
        "articles",
        json!({
            "_and": [
                { "author": { "name": { "_eq": "Ann" } } },
                { "author": { "company": { "country": { "_eq": "NL" } } } }
            ]
        }),
    );
    assert_eq!(sql.matches("LEFT JOIN \"users\"").count(), 1);
    assert_eq!(sql.matches("LEFT JOIN").count(), 2);

    let user = join_alias(&sql, "users");
    assert!(sql.contains(&format!("\"{}\".\"name\" = $1", user)));
}

#[test]
fn test_same_segment_from_different_parents_joins_twice() {
    let (sql, _) = compile_filter(
        "comments",
        json!({
            "_and": [
                { "user": { "name": { "_eq": "Ann" } } },
                { "article": { "author": { "name": { "_eq": "Bob" } } } }
            ]
        }),
    );
    assert_eq!(sql.matches("LEFT JOIN \"users\"").count(), 2);
}

#[test]
fn test_non_relational_segment_is_invalid() {
    let schema = blog_schema();
    let filter = Filter::parse(&json!({ "title": { "length": { "_gt": 3 } } })).unwrap();
    let mut statement = select("articles");
    let err = apply_filter(Dialect::Postgres, "articles", &mut statement, &filter, &schema, false).unwrap_err();
    assert_eq!(err.code(), "INVALID_QUERY");
    assert!(err.reason().contains("\"articles.title\" is not a relational field"));
}

#[test]
fn test_seeded_aliases_are_reproducible() {
    let schema = blog_schema();
    let query = Query::new().with_filter(Filter::parse(&json!({ "author": { "name": { "_eq": "Ann" } } })).unwrap());

    let first = QueryCompiler::new(&schema, Dialect::Postgres)
        .with_alias_seed(42)
        .compile_select("articles", &query)
        .unwrap();
    let second = QueryCompiler::new(&schema, Dialect::Postgres)
        .with_alias_seed(42)
        .compile_select("articles", &query)
        .unwrap();
    assert_eq!(first, second);
}

// =============================================================================
// MANY-TO-ANY
// =============================================================================

#[test]
fn test_many_to_any_without_scope_fails() {
    let schema = blog_schema();
    let filter = Filter::parse(&json!({ "item": { "title": { "_eq": "x" } } })).unwrap();
    let mut statement = select("blocks");
    let err = apply_filter(Dialect::Postgres, "blocks", &mut statement, &filter, &schema, false).unwrap_err();
    assert_eq!(err.code(), "INVALID_QUERY");
}

#[test]
fn test_many_to_any_with_scope_joins_target() {
    let (sql, values) = compile_filter("blocks", json!({ "item:articles": { "title": { "_eq": "x" } } }));
    assert!(sql.contains("LEFT JOIN \"articles\""));
    assert!(sql.contains("\"blocks\".\"collection\" = $1"));
    assert!(sql.contains("CAST("));
    assert_eq!(values.0[0], sea_query::Value::from("articles".to_string()));

    let alias = join_alias(&sql, "articles");
    assert!(sql.contains(&format!("\"{}\".\"title\" = $2", alias)));
}

#[test]
fn test_many_to_any_scope_must_be_allowed() {
    let schema = blog_schema();
    let filter = Filter::parse(&json!({ "item:companies": { "name": { "_eq": "x" } } })).unwrap();
    let mut statement = select("blocks");
    assert!(apply_filter(Dialect::Postgres, "blocks", &mut statement, &filter, &schema, false).is_err());
}

// =============================================================================
// ONE-TO-MANY DECORRELATION
// =============================================================================

#[test]
fn test_top_level_o2m_becomes_in_subquery() {
    let (sql, _) = compile_filter("articles", json!({ "comments": { "body": { "_contains": "nice" } } }));
    assert!(!sql.contains("JOIN"));
    assert!(sql.contains("\"articles\".\"id\" IN (SELECT \"comments\".\"article\" FROM \"comments\" WHERE"));
    assert!(sql.contains("\"comments\".\"article\" IS NOT NULL"));
    assert!(sql.contains("\"comments\".\"body\" LIKE"));
}

#[test]
fn test_o2m_subquery_can_join_further() {
    let (sql, _) = compile_filter(
        "articles",
        json!({ "comments": { "user": { "name": { "_eq": "Ann" } } } }),
    );
    assert!(sql.contains("IN (SELECT \"comments\".\"article\" FROM \"comments\" LEFT JOIN \"users\""));
}

#[test]
fn test_o2m_leaf_without_nested_field_uses_related_key() {
    let (sql, _) = compile_filter("articles", json!({ "comments": { "_nnull": true } }));
    assert!(sql.contains("\"comments\".\"id\" IS NOT NULL"));
    assert!(sql.contains("\"articles\".\"id\" IN (SELECT"));
}

#[test]
fn test_o2m_in_sub_query_mode_is_joined() {
    let schema = blog_schema();
    let filter = Filter::parse(&json!({ "comments": { "body": { "_eq": "x" } } })).unwrap();
    let mut statement = select("articles");
    apply_filter(Dialect::Postgres, "articles", &mut statement, &filter, &schema, true).unwrap();
    let (sql, _) = Dialect::Postgres.build(&statement);
    assert!(sql.contains("LEFT JOIN \"comments\""));
    assert!(!sql.contains("IN (SELECT"));
}

// =============================================================================
// COMMA-SEPARATED LISTS
// =============================================================================

#[test]
fn test_comma_string_equals_list() {
    for operator in ["_in", "_nin"] {
        assert_eq!(
            compile_filter("articles", json!({ "views": { operator: "1,2,3" } })),
            compile_filter("articles", json!({ "views": { operator: [1, 2, 3] } }))
        );
    }
    for operator in ["_between", "_nbetween"] {
        assert_eq!(
            compile_filter("articles", json!({ "views": { operator: "10,20" } })),
            compile_filter("articles", json!({ "views": { operator: [10, 20] } }))
        );
    }
}

#[test]
fn test_between_with_wrong_arity_is_skipped() {
    let (sql, _) = compile_filter("articles", json!({ "views": { "_between": "1,2,3" } }));
    assert!(!sql.contains("WHERE"));
}

#[test]
fn test_float_strings_are_cast() {
    let (_, values) = compile_filter("articles", json!({ "rating": { "_gte": "4.5" } }));
    assert_eq!(values.0, vec![sea_query::Value::from(4.5f64)]);
}

#[test]
fn test_date_part_filter() {
    let (sql, values) = compile_filter("articles", json!({ "year(date_created)": { "_eq": "2024" } }));
    assert!(sql.contains("EXTRACT(YEAR FROM \"articles\".\"date_created\")"));
    assert_eq!(values.0, vec![sea_query::Value::from(2024i64)]);
}

// =============================================================================
// EMPTY FILTERS
// =============================================================================

#[test]
fn test_or_with_empty_member_has_no_where() {
    let (sql, values) = compile_filter(
        "articles",
        json!({ "_or": [ {}, { "author": { "name": { "_eq": "Ann" } } } ] }),
    );
    assert!(!sql.contains("WHERE"));
    assert!(!sql.contains("JOIN"));
    assert!(values.0.is_empty());
}

#[test]
fn test_empty_filter_object_has_no_where() {
    let (sql, _) = compile_filter("articles", json!({}));
    assert!(!sql.contains("WHERE"));
}

#[test]
fn test_nested_groups() {
    let (sql, values) = compile_filter(
        "articles",
        json!({
            "_and": [
                { "views": { "_gt": 10 } },
                { "_or": [ { "title": { "_starts_with": "A" } }, { "title": { "_null": true } } ] }
            ]
        }),
    );
    assert!(sql.contains("\"articles\".\"views\" > $1"));
    assert!(sql.contains("(\"articles\".\"title\" LIKE $2 OR \"articles\".\"title\" IS NULL)"));
    assert_eq!(values.0.len(), 2);
}

#[test]
fn test_apply_query_in_other_dialects() {
    let schema = blog_schema();
    let query = Query::new()
        .with_filter(Filter::parse(&json!({ "item:users": { "name": { "_eq": "x" } } })).unwrap());

    for dialect in [Dialect::Mysql, Dialect::Sqlite] {
        let mut statement = select("blocks");
        apply_query(dialect, "blocks", &mut statement, &query, &schema, false).unwrap();
        let (sql, _) = dialect.build(&statement);
        match dialect {
            Dialect::Mysql => assert!(sql.contains("AS CHAR)")),
            _ => assert!(sql.contains("AS TEXT)")),
        }
    }
}
