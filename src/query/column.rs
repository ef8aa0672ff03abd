//! Terminal column resolution
//!
//! The last segment of a path names a field of the collection the path lands
//! in, optionally wrapped in a field function (`year(date_created)`).

use sea_query::{Alias, Expr, SimpleExpr};

use crate::dialect::{Dialect, FieldFunction};
use crate::schema::{FieldType, SchemaOverview};

use super::errors::{QueryError, QueryResult};

/// A field reference, bound to the table (or alias) it is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    /// Table name or join alias used in SQL
    pub table: String,
    /// Collection the field belongs to
    pub collection: String,
    pub field: String,
    pub function: Option<FieldFunction>,
}

/// Split a terminal segment into its field and optional function
pub fn parse_field_segment(segment: &str) -> QueryResult<(String, Option<FieldFunction>)> {
    match FieldFunction::split(segment) {
        Some((name, field)) => {
            let function = FieldFunction::from_name(name).ok_or_else(|| {
                QueryError::invalid(format!("\"{}\" is not a supported field function", name))
            })?;
            Ok((field.to_string(), Some(function)))
        }
        None => Ok((segment.to_string(), None)),
    }
}

impl ResolvedColumn {
    /// Resolve `segment` on `collection`, read through `table`
    pub fn resolve(
        schema: &SchemaOverview,
        table: &str,
        collection: &str,
        segment: &str,
    ) -> QueryResult<Self> {
        let (field, function) = parse_field_segment(segment)?;

        let overview = schema
            .collection(collection)
            .ok_or_else(|| QueryError::invalid(format!("Collection \"{}\" does not exist", collection)))?;

        if overview.primary != field && !overview.fields.contains_key(&field) {
            return Err(QueryError::invalid(format!(
                "Field \"{}\" does not exist in collection \"{}\"",
                field, collection
            )));
        }

        Ok(Self {
            table: table.to_string(),
            collection: collection.to_string(),
            field,
            function,
        })
    }

    pub fn field_type(&self, schema: &SchemaOverview) -> Option<FieldType> {
        schema.field_type(&self.collection, &self.field)
    }

    /// Date parts are integers regardless of the underlying type
    pub fn is_numeric(&self, schema: &SchemaOverview) -> bool {
        self.function.is_some() || self.field_type(schema).map_or(false, |t| t.is_numeric())
    }

    /// Raw SQL for this column, quoted for `dialect`
    pub fn sql(&self, dialect: Dialect) -> String {
        match self.function {
            Some(function) => dialect.date_part(function, &self.table, &self.field),
            None => dialect.quote_column(&self.table, &self.field),
        }
    }

    pub fn expr(&self, dialect: Dialect) -> SimpleExpr {
        match self.function {
            Some(function) => Expr::cust(dialect.date_part(function, &self.table, &self.field)),
            None => Expr::col((Alias::new(self.table.as_str()), Alias::new(self.field.as_str()))).into(),
        }
    }

    /// Expression builder positioned on this column
    pub fn col(&self, dialect: Dialect) -> Expr {
        Expr::expr(self.expr(dialect))
    }
}
