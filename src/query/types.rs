//! Query description types
//!
//! The request-level description the orchestrator applies to one statement.
//! Everything here is built per request and discarded afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::filter::Filter;

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Order by clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SortRepr")]
pub struct Sort {
    /// Field name or field function, e.g. `year(date_created)`
    pub column: String,
    pub order: SortOrder,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SortRepr {
    Short(String),
    Full {
        column: String,
        #[serde(default)]
        order: SortOrder,
    },
}

impl From<SortRepr> for Sort {
    fn from(repr: SortRepr) -> Self {
        match repr {
            SortRepr::Short(text) => Sort::parse(&text),
            SortRepr::Full { column, order } => Sort { column, order },
        }
    }
}

impl Sort {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: SortOrder::Desc,
        }
    }

    /// `-field` sorts descending, `field` ascending
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match text.strip_prefix('-') {
            Some(column) => Self::desc(column),
            None => Self::asc(text.strip_prefix('+').unwrap_or(text)),
        }
    }
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregateOperation {
    Avg,
    AvgDistinct,
    Count,
    CountDistinct,
    Sum,
    SumDistinct,
    Min,
    Max,
}

impl AggregateOperation {
    /// Name used as the output alias prefix (`sum->amount`)
    pub fn name(&self) -> &'static str {
        match self {
            AggregateOperation::Avg => "avg",
            AggregateOperation::AvgDistinct => "avgDistinct",
            AggregateOperation::Count => "count",
            AggregateOperation::CountDistinct => "countDistinct",
            AggregateOperation::Sum => "sum",
            AggregateOperation::SumDistinct => "sumDistinct",
            AggregateOperation::Min => "min",
            AggregateOperation::Max => "max",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let op = match name {
            "avg" => AggregateOperation::Avg,
            "avgDistinct" => AggregateOperation::AvgDistinct,
            "count" => AggregateOperation::Count,
            "countDistinct" => AggregateOperation::CountDistinct,
            "sum" => AggregateOperation::Sum,
            "sumDistinct" => AggregateOperation::SumDistinct,
            "min" => AggregateOperation::Min,
            "max" => AggregateOperation::Max,
            _ => return None,
        };
        Some(op)
    }
}

/// Requested aggregates: operation → fields
pub type Aggregate = BTreeMap<AggregateOperation, Vec<String>>;

/// Parsed query description
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Query {
    pub sort: Option<Vec<Sort>>,
    /// `-1` means unlimited
    pub limit: Option<i64>,
    pub offset: Option<u64>,
    /// 1-based page; requires a limit
    pub page: Option<u64>,
    pub filter: Option<Filter>,
    pub search: Option<String>,
    pub group: Option<Vec<String>>,
    pub aggregate: Option<Aggregate>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_sort(mut self, sort: Vec<Sort>) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregate = Some(aggregate);
        self
    }

    pub fn with_group(mut self, group: Vec<String>) -> Self {
        self.group = Some(group);
        self
    }

    /// The effective limit, `None` when unlimited
    pub fn effective_limit(&self) -> Option<u64> {
        match self.limit {
            Some(limit) if limit >= 0 => Some(limit as u64),
            _ => None,
        }
    }

    /// Offset derived from `page` when both page and limit are set,
    /// otherwise the explicit offset
    pub fn effective_offset(&self) -> Option<u64> {
        match (self.page, self.effective_limit()) {
            (Some(page), Some(limit)) => Some(limit.saturating_mul(page.saturating_sub(1))),
            _ => self.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sort_parse() {
        assert_eq!(Sort::parse("-date_created"), Sort::desc("date_created"));
        assert_eq!(Sort::parse("title"), Sort::asc("title"));
        assert_eq!(Sort::parse(" +title "), Sort::asc("title"));
    }

    #[test]
    fn test_deserialize_query() {
        let query: Query = serde_json::from_value(json!({
            "sort": ["-date_created", { "column": "title" }],
            "limit": 25,
            "page": 3,
            "filter": { "status": { "_eq": "published" } },
            "search": "rust",
            "group": ["year(date_created)"],
            "aggregate": { "count": ["*"], "sum": ["views"] }
        }))
        .unwrap();

        let sort = query.sort.as_ref().unwrap();
        assert_eq!(sort[0], Sort::desc("date_created"));
        assert_eq!(sort[1], Sort::asc("title"));
        assert_eq!(query.effective_limit(), Some(25));
        assert_eq!(query.effective_offset(), Some(50));
        assert!(query.filter.is_some());

        let aggregate = query.aggregate.unwrap();
        assert_eq!(aggregate[&AggregateOperation::Count], vec!["*"]);
        assert_eq!(aggregate[&AggregateOperation::Sum], vec!["views"]);
    }

    #[test]
    fn test_unknown_aggregate_rejected() {
        let result = serde_json::from_value::<Query>(json!({ "aggregate": { "median": ["x"] } }));
        assert!(result.is_err());
    }

    #[test]
    fn test_unlimited_ignores_page() {
        let query = Query {
            limit: Some(-1),
            page: Some(4),
            offset: Some(7),
            ..Query::default()
        };
        assert_eq!(query.effective_limit(), None);
        assert_eq!(query.effective_offset(), Some(7));
    }

    #[test]
    fn test_aggregate_names() {
        assert_eq!(AggregateOperation::CountDistinct.name(), "countDistinct");
        assert_eq!(AggregateOperation::from_name("sumDistinct"), Some(AggregateOperation::SumDistinct));
        assert_eq!(AggregateOperation::from_name("median"), None);
    }
}
