//! relquery - compiles declarative relational filters into injection-safe SQL
//!
//! A schema overview describes collections and the relations between them;
//! a query description (filter tree, sort, pagination, search, grouping,
//! aggregates) is applied to a `sea_query::SelectStatement` for one of the
//! supported dialects.

pub mod cli;
pub mod config;
pub mod dialect;
pub mod observability;
pub mod query;
pub mod schema;

pub use config::CompilerConfig;
pub use dialect::Dialect;
pub use query::{apply_query, compile_select, Filter, Query, QueryCompiler, QueryError};
pub use schema::SchemaOverview;
