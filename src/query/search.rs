//! Free-text search
//!
//! Matches the term against every searchable field of one collection:
//! textual fields by case-insensitive substring, numeric fields by equality
//! when the term is a number, UUID fields by equality when it is a UUID.

use sea_query::{Alias, Cond, Condition, Expr, Func};
use uuid::Uuid;

use crate::schema::{FieldType, SchemaOverview};

use super::errors::{QueryError, QueryResult};
use super::predicates::parse_number;

/// OR-group of search conditions; `None` when the term is blank or no field
/// can match it
pub fn search_condition(
    schema: &SchemaOverview,
    collection: &str,
    term: &str,
) -> QueryResult<Option<Condition>> {
    let overview = schema
        .collection(collection)
        .ok_or_else(|| QueryError::invalid(format!("Collection \"{}\" does not exist", collection)))?;

    if term.trim().is_empty() {
        return Ok(None);
    }

    let pattern = format!("%{}%", term.to_lowercase());
    let number = parse_number(term);
    let is_uuid = Uuid::parse_str(term.trim()).is_ok();

    let mut condition = Cond::any();
    for (name, field) in &overview.fields {
        let column = Expr::col((Alias::new(collection), Alias::new(name.as_str())));

        if field.field_type.is_textual() {
            condition = condition.add(Expr::expr(Func::lower(column)).like(pattern.clone()));
        } else if field.field_type.is_numeric() {
            if let Some(number) = &number {
                condition = condition.add(column.eq(number.clone()));
            }
        } else if field.field_type == FieldType::Uuid && is_uuid {
            condition = condition.add(column.eq(term.trim()));
        }
    }

    Ok(if condition.is_empty() { None } else { Some(condition) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::schema::CollectionOverview;
    use sea_query::Query;

    fn schema() -> SchemaOverview {
        SchemaOverview::new()
            .with_collection(
                "articles",
                CollectionOverview::new("id")
                    .with_field("id", FieldType::Integer)
                    .with_field("title", FieldType::String)
                    .with_field("body", FieldType::Text)
                    .with_field("token", FieldType::Uuid)
                    .with_field("published", FieldType::Boolean),
            )
            .with_collection(
                "notes",
                CollectionOverview::new("key").with_field("key", FieldType::Uuid),
            )
    }

    fn render(collection: &str, term: &str) -> String {
        let mut statement = Query::select();
        statement.from(Alias::new(collection));
        if let Some(condition) = search_condition(&schema(), collection, term).unwrap() {
            statement.cond_where(condition);
        }
        Dialect::Postgres.to_inline_sql(&statement)
    }

    #[test]
    fn test_text_term_searches_text_fields_only() {
        let sql = render("articles", "Foo");
        assert!(sql.contains("LOWER(\"articles\".\"title\") LIKE '%foo%'"));
        assert!(sql.contains("LOWER(\"articles\".\"body\") LIKE '%foo%'"));
        assert!(!sql.contains("\"id\""));
        assert!(!sql.contains("\"token\""));
        assert!(!sql.contains("\"published\""));
    }

    #[test]
    fn test_numeric_term_matches_numeric_fields() {
        let sql = render("articles", "42");
        assert!(sql.contains("\"articles\".\"id\" = 42"));
    }

    #[test]
    fn test_uuid_term_matches_uuid_fields() {
        let sql = render("articles", "67e55044-10b1-426f-9247-bb680e5fe0c8");
        assert!(sql.contains("\"articles\".\"token\" = '67e55044-10b1-426f-9247-bb680e5fe0c8'"));
    }

    #[test]
    fn test_no_matching_fields_emits_nothing() {
        let sql = render("notes", "hello");
        assert!(!sql.contains("WHERE"));
    }

    #[test]
    fn test_blank_term_emits_nothing() {
        assert!(!render("articles", "").contains("WHERE"));
        assert!(!render("articles", "   ").contains("WHERE"));
    }

    #[test]
    fn test_unknown_collection() {
        assert!(search_condition(&schema(), "missing", "x").is_err());
    }
}
