//! # Query Orchestrator
//!
//! Applies a [`Query`] description to one mutable `SelectStatement`, in a
//! fixed order:
//!
//! 1. sort
//! 2. limit (`-1` is unlimited)
//! 3. offset, or `limit * (page - 1)` when a page is given
//! 4. filter (join planner, then predicate compiler)
//! 5. search
//! 6. group
//! 7. aggregate
//!
//! In sub-query mode the statement is a correlated-free subquery rooted at a
//! related collection; one-to-many hops are then joined like any other.

use sea_query::{Alias, Asterisk, Order, Query as SelectQuery, SelectStatement, Values};

use crate::dialect::Dialect;
use crate::observability::Logger;
use crate::schema::SchemaOverview;

use super::aggregate::add_aggregates;
use super::alias::{AliasAllocator, AliasMap};
use super::column::ResolvedColumn;
use super::errors::{QueryError, QueryResult};
use super::filter::Filter;
use super::joins::{join_path, plan_joins};
use super::predicates::apply_predicates;
use super::search::search_condition;
use super::types::{Aggregate, Query, SortOrder};

/// Per-statement compilation state shared by the join planner and the
/// predicate compiler
#[derive(Debug)]
pub struct FilterCompilation<'a> {
    pub(crate) schema: &'a SchemaOverview,
    pub(crate) dialect: Dialect,
    /// Root collection of the statement
    pub(crate) collection: &'a str,
    pub(crate) sub_query: bool,
    pub(crate) aliases: AliasMap,
    pub(crate) allocator: &'a mut AliasAllocator,
}

impl<'a> FilterCompilation<'a> {
    pub fn new(
        schema: &'a SchemaOverview,
        dialect: Dialect,
        collection: &'a str,
        sub_query: bool,
        allocator: &'a mut AliasAllocator,
    ) -> Self {
        Self {
            schema,
            dialect,
            collection,
            sub_query,
            aliases: AliasMap::new(),
            allocator,
        }
    }

    /// Joins created so far
    pub fn aliases(&self) -> &AliasMap {
        &self.aliases
    }

    pub fn into_aliases(self) -> AliasMap {
        self.aliases
    }

    /// Column for a sort/filter path, joining relational hops as needed
    fn column_for_path(&mut self, statement: &mut SelectStatement, key: &str) -> QueryResult<ResolvedColumn> {
        let path: Vec<String> = key.split('.').map(str::to_string).collect();
        if path.len() == 1 {
            return ResolvedColumn::resolve(self.schema, self.collection, self.collection, key);
        }

        join_path(self, statement, &path)?;

        let hops = super::relations::RelationGraph::new(self.schema).resolve(self.collection, &path)?;
        let (last, relational) = path
            .split_last()
            .ok_or_else(|| QueryError::invalid("Empty field path"))?;
        let table = self.aliases.lookup_path(relational).ok_or_else(|| {
            QueryError::invalid(format!("\"{}\" cannot be resolved to a joined column", key))
        })?;
        let target = hops
            .last()
            .map(|hop| hop.target.as_str())
            .unwrap_or(self.collection);

        ResolvedColumn::resolve(self.schema, table, target, last)
    }
}

/// Compiled statement, ready to hand to a database driver
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// SQL with dialect placeholders
    pub sql: String,
    pub bindings: Values,
    /// SQL with values inlined, for diagnostics only
    pub inline: String,
}

/// Stateful compiler owning the alias allocator.
///
/// ```ignore
/// let mut compiler = QueryCompiler::new(&schema, Dialect::Postgres).with_alias_seed(7);
/// let compiled = compiler.compile_select("articles", &query)?;
/// ```
#[derive(Debug)]
pub struct QueryCompiler<'a> {
    schema: &'a SchemaOverview,
    dialect: Dialect,
    allocator: AliasAllocator,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(schema: &'a SchemaOverview, dialect: Dialect) -> Self {
        Self {
            schema,
            dialect,
            allocator: AliasAllocator::new(),
        }
    }

    /// Reproducible join aliases
    pub fn with_alias_seed(mut self, seed: u64) -> Self {
        self.allocator = AliasAllocator::seeded(seed);
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn apply_query(
        &mut self,
        collection: &str,
        statement: &mut SelectStatement,
        query: &Query,
        sub_query: bool,
    ) -> QueryResult<AliasMap> {
        Logger::trace(
            "QUERY_COMPILE_START",
            &[("collection", collection), ("dialect", self.dialect.as_str())],
        );

        let result = run_query(
            &mut self.allocator,
            self.dialect,
            collection,
            statement,
            query,
            self.schema,
            sub_query,
        );

        if let Err(e) = &result {
            Logger::warn(
                "QUERY_INVALID",
                &[("collection", collection), ("reason", e.reason())],
            );
        }
        result
    }

    pub fn apply_filter(
        &mut self,
        collection: &str,
        statement: &mut SelectStatement,
        filter: &Filter,
        sub_query: bool,
    ) -> QueryResult<AliasMap> {
        let mut ctx = FilterCompilation::new(self.schema, self.dialect, collection, sub_query, &mut self.allocator);
        plan_joins(&mut ctx, statement, filter)?;
        apply_predicates(&mut ctx, statement, filter)?;
        Ok(ctx.into_aliases())
    }

    pub fn apply_search(&self, collection: &str, statement: &mut SelectStatement, search: &str) -> QueryResult<()> {
        apply_search(self.schema, collection, statement, search)
    }

    pub fn apply_aggregate(
        &self,
        collection: &str,
        statement: &mut SelectStatement,
        aggregate: &Aggregate,
    ) -> QueryResult<()> {
        add_aggregates(self.dialect, self.schema, collection, statement, aggregate)
    }

    /// Build and render a complete `SELECT` for `collection`
    pub fn compile_select(&mut self, collection: &str, query: &Query) -> QueryResult<CompiledQuery> {
        if self.schema.collection(collection).is_none() {
            let err = QueryError::invalid(format!("Collection \"{}\" does not exist", collection));
            Logger::warn("QUERY_INVALID", &[("collection", collection), ("reason", err.reason())]);
            return Err(err);
        }

        let mut statement = SelectQuery::select();
        statement.from(Alias::new(collection));

        let grouped = query.group.as_ref().map_or(false, |g| !g.is_empty());
        let aggregated = query.aggregate.as_ref().map_or(false, |a| !a.is_empty());

        if grouped {
            for key in query.group.iter().flatten() {
                let column = ResolvedColumn::resolve(self.schema, collection, collection, key)?;
                statement.expr_as(column.expr(self.dialect), Alias::new(key.as_str()));
            }
        } else if !aggregated {
            statement.column((Alias::new(collection), Asterisk));
        }

        self.apply_query(collection, &mut statement, query, false)?;

        let (sql, bindings) = self.dialect.build(&statement);
        let inline = self.dialect.to_inline_sql(&statement);

        Logger::info(
            "QUERY_COMPILED",
            &[
                ("bindings", bindings.0.len().to_string().as_str()),
                ("collection", collection),
                ("sql", sql.as_str()),
            ],
        );

        Ok(CompiledQuery { sql, bindings, inline })
    }
}

/// Apply every part of `query` to `statement`
pub(crate) fn run_query(
    allocator: &mut AliasAllocator,
    dialect: Dialect,
    collection: &str,
    statement: &mut SelectStatement,
    query: &Query,
    schema: &SchemaOverview,
    sub_query: bool,
) -> QueryResult<AliasMap> {
    let mut ctx = FilterCompilation::new(schema, dialect, collection, sub_query, allocator);

    if let Some(sort) = &query.sort {
        for entry in sort {
            let column = ctx.column_for_path(statement, &entry.column)?;
            let order = match entry.order {
                SortOrder::Asc => Order::Asc,
                SortOrder::Desc => Order::Desc,
            };
            statement.order_by_expr(column.expr(dialect), order);
        }
    }

    if let Some(limit) = query.effective_limit() {
        statement.limit(limit);
    }

    if let Some(offset) = query.effective_offset() {
        if offset > 0 {
            statement.offset(offset);
        }
    }

    if let Some(filter) = &query.filter {
        plan_joins(&mut ctx, statement, filter)?;
        apply_predicates(&mut ctx, statement, filter)?;
    }

    if let Some(search) = &query.search {
        apply_search(schema, collection, statement, search)?;
    }

    if let Some(group) = &query.group {
        let mut columns = Vec::with_capacity(group.len());
        for key in group {
            if key.contains('.') {
                return Err(QueryError::invalid(format!(
                    "Grouping by relational fields is not supported: \"{}\"",
                    key
                )));
            }
            columns.push(ResolvedColumn::resolve(schema, collection, collection, key)?.expr(dialect));
        }
        statement.add_group_by(columns);
    }

    if let Some(aggregate) = &query.aggregate {
        add_aggregates(dialect, schema, collection, statement, aggregate)?;
    }

    Ok(ctx.into_aliases())
}

/// Apply a full query description to `statement`
pub fn apply_query(
    dialect: Dialect,
    collection: &str,
    statement: &mut SelectStatement,
    query: &Query,
    schema: &SchemaOverview,
    sub_query: bool,
) -> QueryResult<()> {
    QueryCompiler::new(schema, dialect)
        .apply_query(collection, statement, query, sub_query)
        .map(|_| ())
}

/// Apply only a filter, returning the join aliases it created
pub fn apply_filter(
    dialect: Dialect,
    collection: &str,
    statement: &mut SelectStatement,
    filter: &Filter,
    schema: &SchemaOverview,
    sub_query: bool,
) -> QueryResult<AliasMap> {
    QueryCompiler::new(schema, dialect).apply_filter(collection, statement, filter, sub_query)
}

/// AND an OR-group of search conditions onto `statement`
pub fn apply_search(
    schema: &SchemaOverview,
    collection: &str,
    statement: &mut SelectStatement,
    search: &str,
) -> QueryResult<()> {
    if let Some(condition) = search_condition(schema, collection, search)? {
        statement.cond_where(condition);
    }
    Ok(())
}

pub fn apply_aggregate(
    dialect: Dialect,
    collection: &str,
    statement: &mut SelectStatement,
    aggregate: &Aggregate,
    schema: &SchemaOverview,
) -> QueryResult<()> {
    add_aggregates(dialect, schema, collection, statement, aggregate)
}

/// One-shot `compile_select` with random aliases
pub fn compile_select(
    dialect: Dialect,
    collection: &str,
    query: &Query,
    schema: &SchemaOverview,
) -> QueryResult<CompiledQuery> {
    QueryCompiler::new(schema, dialect).compile_select(collection, query)
}
