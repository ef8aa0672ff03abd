//! # Query Compiler
//!
//! Translates a declarative query description into a `sea_query`
//! `SelectStatement`:
//!
//! - relation paths become `LEFT JOIN`s with generated aliases
//! - one-to-many paths at the root become `pk IN (SELECT ...)`
//! - filter leaves become bound predicates grouped by `_and` / `_or`
//! - search, group and aggregate clauses are appended last
//!
//! Values are always bound; identifiers only reach raw fragments through
//! dialect quoting.

mod aggregate;
mod alias;
mod apply;
mod column;
mod errors;
mod filter;
mod joins;
mod predicates;
mod relations;
mod sanitize;
mod search;
mod types;
mod variables;

pub use alias::{AliasAllocator, AliasMap};
pub use apply::{
    apply_aggregate, apply_filter, apply_query, apply_search, compile_select, CompiledQuery,
    FilterCompilation, QueryCompiler,
};
pub use column::ResolvedColumn;
pub use errors::{QueryError, QueryResult};
pub use filter::{Comparand, Filter, FilterLeaf, FilterNode, FilterOperator, LogicalOperator};
pub use relations::{relation_info, split_scope, RelationGraph, RelationHop, RelationType};
pub use sanitize::{sanitize_query, sanitize_query_with};
pub use search::search_condition;
pub use types::{Aggregate, AggregateOperation, Query, Sort, SortOrder};
pub use variables::FilterContext;
