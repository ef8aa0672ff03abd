//! Aggregate select expressions
//!
//! Each `(operation, field)` pair selects `OP(collection.field)` under the
//! output name `op->field`; `count` of `*` is selected as `count`.

use sea_query::{Alias, Asterisk, Expr, Func, SelectStatement, SimpleExpr};

use crate::dialect::Dialect;
use crate::schema::SchemaOverview;

use super::column::ResolvedColumn;
use super::errors::{QueryError, QueryResult};
use super::types::{Aggregate, AggregateOperation};

/// Add one select expression per requested aggregate
pub fn add_aggregates(
    dialect: Dialect,
    schema: &SchemaOverview,
    collection: &str,
    statement: &mut SelectStatement,
    aggregate: &Aggregate,
) -> QueryResult<()> {
    for (operation, fields) in aggregate {
        for field in fields {
            if field == "*" {
                if *operation != AggregateOperation::Count {
                    return Err(QueryError::invalid(format!(
                        "\"*\" can only be used with count, not {}",
                        operation.name()
                    )));
                }
                statement.expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"));
                continue;
            }

            let column = ResolvedColumn::resolve(schema, collection, collection, field)?;
            if column.function.is_some() {
                return Err(QueryError::invalid(format!(
                    "Field functions cannot be aggregated: \"{}\"",
                    field
                )));
            }

            statement.expr_as(
                aggregate_expr(dialect, *operation, &column),
                Alias::new(format!("{}->{}", operation.name(), field)),
            );
        }
    }
    Ok(())
}

fn aggregate_expr(dialect: Dialect, operation: AggregateOperation, column: &ResolvedColumn) -> SimpleExpr {
    let col = column.expr(dialect);
    match operation {
        AggregateOperation::Avg => Func::avg(col).into(),
        AggregateOperation::Count => Func::count(col).into(),
        AggregateOperation::Sum => Func::sum(col).into(),
        AggregateOperation::Min => Func::min(col).into(),
        AggregateOperation::Max => Func::max(col).into(),
        AggregateOperation::AvgDistinct => distinct(dialect, "AVG", column),
        AggregateOperation::CountDistinct => distinct(dialect, "COUNT", column),
        AggregateOperation::SumDistinct => distinct(dialect, "SUM", column),
    }
}

fn distinct(dialect: Dialect, function: &str, column: &ResolvedColumn) -> SimpleExpr {
    Expr::cust(format!("{}(DISTINCT {})", function, column.sql(dialect)))
}
