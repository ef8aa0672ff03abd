//! # SQL Dialect Helpers
//!
//! Pure functions producing dialect-specific raw SQL fragments:
//! - identifier quoting (the only way identifiers reach raw fragments)
//! - date-part extraction for field functions such as `year(date_created)`
//! - geometry predicates for the `_intersects` family of operators
//! - text casts used by many-to-any join conditions
//!
//! Fragments that need a value carry exactly one placeholder; the value is
//! bound through `sea_query::Expr::cust_with_values`, never interpolated.

mod functions;
mod geometry;

use std::fmt;
use std::str::FromStr;

use sea_query::{MysqlQueryBuilder, PostgresQueryBuilder, SelectStatement, SqliteQueryBuilder, Values};
use serde::{Deserialize, Serialize};

pub use functions::FieldFunction;

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgres,
    Mysql,
    Sqlite,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Mysql => "mysql",
            Dialect::Sqlite => "sqlite",
        }
    }

    fn quote_char(&self) -> char {
        match self {
            Dialect::Mysql => '`',
            Dialect::Postgres | Dialect::Sqlite => '"',
        }
    }

    /// Quote a single identifier, doubling any embedded quote characters
    pub fn quote_identifier(&self, identifier: &str) -> String {
        let q = self.quote_char();
        let mut quoted = String::with_capacity(identifier.len() + 2);
        quoted.push(q);
        for c in identifier.chars() {
            if c == q {
                quoted.push(q);
            }
            quoted.push(c);
        }
        quoted.push(q);
        quoted
    }

    /// Quote a `table.column` reference for use inside a raw fragment
    pub fn quote_column(&self, table: &str, column: &str) -> String {
        format!(
            "{}.{}",
            self.quote_identifier(table),
            self.quote_identifier(column)
        )
    }

    /// Cast an expression to text so it can be compared with a string key
    pub fn cast_to_text(&self, sql: &str) -> String {
        match self {
            Dialect::Mysql => format!("CAST({} AS CHAR)", sql),
            Dialect::Postgres | Dialect::Sqlite => format!("CAST({} AS TEXT)", sql),
        }
    }

    /// Render a statement with placeholders and its bound values
    pub fn build(&self, statement: &SelectStatement) -> (String, Values) {
        match self {
            Dialect::Postgres => statement.build(PostgresQueryBuilder),
            Dialect::Mysql => statement.build(MysqlQueryBuilder),
            Dialect::Sqlite => statement.build(SqliteQueryBuilder),
        }
    }

    /// Render a statement with values inlined (diagnostics only)
    pub fn to_inline_sql(&self, statement: &SelectStatement) -> String {
        match self {
            Dialect::Postgres => statement.to_string(PostgresQueryBuilder),
            Dialect::Mysql => statement.to_string(MysqlQueryBuilder),
            Dialect::Sqlite => statement.to_string(SqliteQueryBuilder),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::Mysql),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            other => Err(format!("Unsupported dialect: {}", other)),
        }
    }
}
