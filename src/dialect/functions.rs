//! Field functions
//!
//! A path segment may wrap a column in a date-part function, e.g.
//! `year(date_created)`. Each dialect extracts the part differently; all of
//! them produce an integer.

use std::sync::OnceLock;

use regex::Regex;

use super::Dialect;

/// Date-part functions usable in filters, sorts and groups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFunction {
    Year,
    Month,
    Week,
    Day,
    Weekday,
    Hour,
    Minute,
    Second,
}

fn function_syntax() -> &'static Regex {
    static SYNTAX: OnceLock<Regex> = OnceLock::new();
    SYNTAX.get_or_init(|| {
        Regex::new(r"^([A-Za-z_]+)\(([^()]+)\)$").expect("function syntax regex is valid")
    })
}

impl FieldFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "year" => Some(FieldFunction::Year),
            "month" => Some(FieldFunction::Month),
            "week" => Some(FieldFunction::Week),
            "day" => Some(FieldFunction::Day),
            "weekday" => Some(FieldFunction::Weekday),
            "hour" => Some(FieldFunction::Hour),
            "minute" => Some(FieldFunction::Minute),
            "second" => Some(FieldFunction::Second),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldFunction::Year => "year",
            FieldFunction::Month => "month",
            FieldFunction::Week => "week",
            FieldFunction::Day => "day",
            FieldFunction::Weekday => "weekday",
            FieldFunction::Hour => "hour",
            FieldFunction::Minute => "minute",
            FieldFunction::Second => "second",
        }
    }

    /// Split `name(field)` into its function name and field.
    ///
    /// Returns `None` when the segment is a bare field name. The function
    /// name is returned unvalidated so callers can report unknown names.
    pub fn split(segment: &str) -> Option<(&str, &str)> {
        let captures = function_syntax().captures(segment)?;
        let name = captures.get(1)?.as_str();
        let field = captures.get(2)?.as_str().trim();
        Some((name, field))
    }

    /// Raw SQL extracting this part from an already-quoted column
    pub fn apply(&self, dialect: Dialect, column_sql: &str) -> String {
        match dialect {
            Dialect::Postgres => {
                let part = match self {
                    FieldFunction::Year => "YEAR",
                    FieldFunction::Month => "MONTH",
                    FieldFunction::Week => "WEEK",
                    FieldFunction::Day => "DAY",
                    FieldFunction::Weekday => "DOW",
                    FieldFunction::Hour => "HOUR",
                    FieldFunction::Minute => "MINUTE",
                    FieldFunction::Second => "SECOND",
                };
                format!("EXTRACT({} FROM {})", part, column_sql)
            }
            Dialect::Mysql => {
                let func = match self {
                    FieldFunction::Year => "YEAR",
                    FieldFunction::Month => "MONTH",
                    FieldFunction::Week => "WEEK",
                    FieldFunction::Day => "DAYOFMONTH",
                    FieldFunction::Weekday => "DAYOFWEEK",
                    FieldFunction::Hour => "HOUR",
                    FieldFunction::Minute => "MINUTE",
                    FieldFunction::Second => "SECOND",
                };
                format!("{}({})", func, column_sql)
            }
            Dialect::Sqlite => {
                let format = match self {
                    FieldFunction::Year => "%Y",
                    FieldFunction::Month => "%m",
                    FieldFunction::Week => "%W",
                    FieldFunction::Day => "%d",
                    FieldFunction::Weekday => "%w",
                    FieldFunction::Hour => "%H",
                    FieldFunction::Minute => "%M",
                    FieldFunction::Second => "%S",
                };
                format!("CAST(strftime('{}', {}) AS INTEGER)", format, column_sql)
            }
        }
    }
}

impl Dialect {
    /// Date-part extraction for `table.column`
    pub fn date_part(&self, function: FieldFunction, table: &str, column: &str) -> String {
        function.apply(*self, &self.quote_column(table, column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_function_segment() {
        assert_eq!(FieldFunction::split("year(date_created)"), Some(("year", "date_created")));
        assert_eq!(FieldFunction::split("title"), None);
        assert_eq!(FieldFunction::split("year(a(b))"), None);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(FieldFunction::from_name("weekday"), Some(FieldFunction::Weekday));
        assert_eq!(FieldFunction::from_name("decade"), None);
        assert_eq!(FieldFunction::Weekday.name(), "weekday");
    }

    #[test]
    fn test_date_part_per_dialect() {
        assert_eq!(
            Dialect::Postgres.date_part(FieldFunction::Year, "articles", "date_created"),
            "EXTRACT(YEAR FROM \"articles\".\"date_created\")"
        );
        assert_eq!(
            Dialect::Mysql.date_part(FieldFunction::Day, "articles", "date_created"),
            "DAYOFMONTH(`articles`.`date_created`)"
        );
        assert_eq!(
            Dialect::Sqlite.date_part(FieldFunction::Month, "articles", "date_created"),
            "CAST(strftime('%m', \"articles\".\"date_created\") AS INTEGER)"
        );
    }
}
