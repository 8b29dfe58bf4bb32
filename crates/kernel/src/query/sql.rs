//! SQL data source using SeaQuery.
//!
//! Renders compiled queries as SELECT statements for:
//! - PostgreSQL
//! - SQLite
//!
//! Execution is delegated to a [`SqlExecutor`]; this module never talks to a
//! database itself.

use std::sync::Arc;

use sea_query::{
    Alias, Asterisk, Cond, Condition, Expr, ExprTrait, Order, PostgresQueryBuilder, Query,
    SelectStatement, SimpleExpr, SqliteQueryBuilder, Values,
};
use serde::Serialize;
use thiserror::Error;

use super::operators::Comparison;
use super::queryable::{Clause, ClauseBuilder, Model, Predicate, Queryable, WhereClause};
use super::types::{FilterValue, Joiner, SortDirection};

/// SQL dialect used to render statements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SqlBackend {
    #[default]
    Postgres,
    Sqlite,
}

impl SqlBackend {
    /// Parse a backend name (`postgres` or `sqlite`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(SqlBackend::Postgres),
            "sqlite" => Some(SqlBackend::Sqlite),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SqlBackend::Postgres => "postgres",
            SqlBackend::Sqlite => "sqlite",
        }
    }

    /// Render with values inlined.
    pub fn render(&self, statement: &SelectStatement) -> String {
        match self {
            SqlBackend::Postgres => statement.to_string(PostgresQueryBuilder),
            SqlBackend::Sqlite => statement.to_string(SqliteQueryBuilder),
        }
    }

    /// Render with placeholders and a separate value list.
    pub fn build(&self, statement: &SelectStatement) -> SqlStatement {
        let (sql, values) = match self {
            SqlBackend::Postgres => statement.build(PostgresQueryBuilder),
            SqlBackend::Sqlite => statement.build(SqliteQueryBuilder),
        };
        SqlStatement { sql, values }
    }
}

/// A parameterized statement ready for execution.
#[derive(Debug, Clone)]
pub struct SqlStatement {
    pub sql: String,
    pub values: Values,
}

/// Runs rendered statements against a database.
pub trait SqlExecutor {
    type Row: Serialize;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run a SELECT and return its rows in order.
    fn fetch_rows(&self, statement: &SqlStatement) -> Result<Vec<Self::Row>, Self::Error>;

    /// Run a `SELECT COUNT(*)` and return the single count.
    fn fetch_count(&self, statement: &SqlStatement) -> Result<u64, Self::Error>;
}

/// Executor for rendering statements without a database connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconnected;

/// Returned by [`Unconnected`] for every execution attempt.
#[derive(Debug, Error)]
#[error("no database connection to run: {sql}")]
pub struct NotConnected {
    pub sql: String,
}

impl SqlExecutor for Unconnected {
    type Row = serde_json::Value;
    type Error = NotConnected;

    fn fetch_rows(&self, statement: &SqlStatement) -> Result<Vec<Self::Row>, NotConnected> {
        Err(NotConnected {
            sql: statement.sql.clone(),
        })
    }

    fn fetch_count(&self, statement: &SqlStatement) -> Result<u64, NotConnected> {
        Err(NotConnected {
            sql: statement.sql.clone(),
        })
    }
}

/// A database table reached through an executor.
#[derive(Debug)]
pub struct SqlTable<E> {
    table: String,
    backend: SqlBackend,
    executor: Arc<E>,
}

impl<E> SqlTable<E> {
    pub fn new(table: impl Into<String>, backend: SqlBackend, executor: E) -> Self {
        Self {
            table: table.into(),
            backend,
            executor: Arc::new(executor),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn backend(&self) -> SqlBackend {
        self.backend
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }
}

impl<E: SqlExecutor> Model for SqlTable<E> {
    type Query = SqlQuery<E>;

    fn new_query(&self) -> SqlQuery<E> {
        SqlQuery {
            table: self.table.clone(),
            backend: self.backend,
            executor: Arc::clone(&self.executor),
            builder: ClauseBuilder::default(),
            orders: Vec::new(),
            offset: None,
            limit: None,
        }
    }
}

/// Query against a [`SqlTable`].
#[derive(Debug)]
pub struct SqlQuery<E> {
    table: String,
    backend: SqlBackend,
    executor: Arc<E>,
    builder: ClauseBuilder,
    orders: Vec<(String, SortDirection)>,
    offset: Option<u64>,
    limit: Option<u64>,
}

impl<E> Clone for SqlQuery<E> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            backend: self.backend,
            executor: Arc::clone(&self.executor),
            builder: self.builder.clone(),
            orders: self.orders.clone(),
            offset: self.offset,
            limit: self.limit,
        }
    }
}

impl<E> SqlQuery<E> {
    /// Predicates accumulated so far.
    pub fn clause(&self) -> &WhereClause {
        self.builder.clause()
    }

    /// Build the page SELECT with ordering and window.
    pub fn to_select(&self) -> SelectStatement {
        let mut query = Query::select();
        query.column(Asterisk).from(Alias::new(&self.table));

        if let Some(cond) = condition(self.builder.clause()) {
            query.cond_where(cond);
        }

        for (field, direction) in &self.orders {
            let order = match direction {
                SortDirection::Asc => Order::Asc,
                SortDirection::Desc => Order::Desc,
            };
            query.order_by(Alias::new(field), order);
        }

        if let Some(limit) = self.limit {
            query.limit(limit);
        }
        if let Some(offset) = self.offset {
            query.offset(offset);
        }
        query
    }

    /// Build the COUNT query. Ordering and window are left out.
    pub fn to_count(&self) -> SelectStatement {
        let mut query = Query::select();
        query
            .expr(Expr::col(Asterisk).count())
            .from(Alias::new(&self.table));

        if let Some(cond) = condition(self.builder.clause()) {
            query.cond_where(cond);
        }
        query
    }

    /// Page query with values inlined.
    pub fn to_sql(&self) -> String {
        self.backend.render(&self.to_select())
    }

    /// Count query with values inlined.
    pub fn to_count_sql(&self) -> String {
        self.backend.render(&self.to_count())
    }

    /// Parameterized page query.
    pub fn statement(&self) -> SqlStatement {
        self.backend.build(&self.to_select())
    }

    /// Parameterized count query.
    pub fn count_statement(&self) -> SqlStatement {
        self.backend.build(&self.to_count())
    }
}

impl<E: SqlExecutor> Queryable for SqlQuery<E> {
    type Row = E::Row;
    type Error = E::Error;

    fn where_predicate(&mut self, predicate: Predicate, joiner: Joiner) {
        self.builder.push(joiner, predicate);
    }

    fn where_group<F>(&mut self, joiner: Joiner, build: F)
    where
        F: FnOnce(&mut Self),
    {
        let outer = self.builder.open();
        build(self);
        self.builder.close(outer, joiner);
    }

    fn order_by(&mut self, field: &str, direction: SortDirection) {
        self.orders.push((field.to_string(), direction));
    }

    fn skip(&mut self, offset: u64) {
        self.offset = Some(offset);
    }

    fn take(&mut self, limit: u64) {
        self.limit = Some(limit);
    }

    fn get(self) -> Result<Vec<E::Row>, E::Error> {
        let statement = self.statement();
        tracing::debug!(sql = %statement.sql, "executing page query");
        self.executor.fetch_rows(&statement)
    }

    fn count(self) -> Result<u64, E::Error> {
        let statement = self.count_statement();
        tracing::debug!(sql = %statement.sql, "executing count query");
        self.executor.fetch_count(&statement)
    }
}

/// Convert a where clause into nested conditions.
///
/// A run of clauses sharing one joiner becomes a single `Cond::all` or
/// `Cond::any`; a change of joiner wraps what came before.
fn condition(clause: &WhereClause) -> Option<Condition> {
    let mut acc: Option<(Joiner, Condition)> = None;
    for (joiner, item) in clause.clauses() {
        let next = match item {
            Clause::Predicate(p) => Cond::all().add(predicate_expr(p)),
            Clause::Group(inner) => match condition(inner) {
                Some(c) => c,
                None => continue,
            },
        };
        acc = Some(match acc {
            None => (Joiner::And, Cond::all().add(next)),
            Some((kind, cond)) if kind == *joiner => (kind, cond.add(next)),
            Some((_, cond)) => (*joiner, junction(*joiner).add(cond).add(next)),
        });
    }
    acc.map(|(_, cond)| cond)
}

fn junction(joiner: Joiner) -> Condition {
    match joiner {
        Joiner::And => Cond::all(),
        Joiner::Or => Cond::any(),
    }
}

fn predicate_expr(predicate: &Predicate) -> SimpleExpr {
    let col: SimpleExpr = Expr::col(Alias::new(&predicate.field)).into();
    let value = &predicate.value;

    match predicate.comparison {
        Comparison::Equal => match value {
            FilterValue::Null => col.is_null(),
            FilterValue::List(items) => col.is_in(items.iter().filter_map(scalar)),
            other => scalar_or_false(other, |v| col.eq(v)),
        },
        Comparison::NotEqual => match value {
            FilterValue::Null => col.is_not_null(),
            FilterValue::List(items) => col.is_not_in(items.iter().filter_map(scalar)),
            other => scalar_or_false(other, |v| col.ne(v)),
        },
        Comparison::Greater => scalar_or_false(value, |v| col.gt(v)),
        Comparison::GreaterOrEqual => scalar_or_false(value, |v| col.gte(v)),
        Comparison::Less => scalar_or_false(value, |v| col.lt(v)),
        Comparison::LessOrEqual => scalar_or_false(value, |v| col.lte(v)),
        Comparison::Like => match value.as_string() {
            Some(pattern) => col.like(pattern),
            None => nothing(),
        },
        Comparison::NotLike => match value.as_string() {
            Some(pattern) => col.not_like(pattern),
            None => nothing(),
        },
    }
}

/// Constant false, for comparisons that have no scalar operand.
fn nothing() -> SimpleExpr {
    Expr::val(false).into()
}

/// A comparison against `null` or a list matches nothing.
fn scalar_or_false<F>(value: &FilterValue, compare: F) -> SimpleExpr
where
    F: FnOnce(sea_query::Value) -> SimpleExpr,
{
    match scalar(value) {
        Some(v) => compare(v),
        None => nothing(),
    }
}

fn scalar(value: &FilterValue) -> Option<sea_query::Value> {
    match value {
        FilterValue::Boolean(b) => Some((*b).into()),
        FilterValue::Integer(i) => Some((*i).into()),
        FilterValue::Float(f) => Some((*f).into()),
        FilterValue::String(s) => Some(s.clone().into()),
        FilterValue::List(_) | FilterValue::Null => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::query::filter;
    use crate::query::parser::parse_filter;
    use crate::query::types::FilterNode;
    use serde_json::json;

    fn table(backend: SqlBackend) -> SqlTable<Unconnected> {
        SqlTable::new("items", backend, Unconnected)
    }

    fn compiled(node: &FilterNode) -> SqlQuery<Unconnected> {
        let mut q = table(SqlBackend::Postgres).new_query();
        filter::compile(&mut q, node, Joiner::And).unwrap();
        q
    }

    #[test]
    fn simple_select() {
        let q = table(SqlBackend::Postgres).new_query();
        let sql = q.to_sql();
        assert!(sql.contains("SELECT *"));
        assert!(sql.contains("FROM \"items\""));
        assert!(!sql.contains("WHERE"));
    }

    #[test]
    fn nested_groups_are_parenthesized() {
        let node = FilterNode::group(
            Joiner::And,
            vec![
                FilterNode::comparison("a", "equal", 1),
                FilterNode::group(
                    Joiner::Or,
                    vec![
                        FilterNode::comparison("b", "equal", 2),
                        FilterNode::comparison("c", "equal", 3),
                    ],
                ),
            ],
        );
        let sql = compiled(&node).to_sql();
        assert!(sql.contains("\"a\" = 1"), "{sql}");
        assert!(sql.contains("(\"b\" = 2 OR \"c\" = 3)"), "{sql}");
    }

    #[test]
    fn or_root_renders_or() {
        let node = parse_filter(&json!([["a", "equal", 1], "or", ["b", "equal", 2]])).unwrap();
        let sql = compiled(&node).to_sql();
        assert!(sql.contains("\"a\" = 1 OR \"b\" = 2"), "{sql}");
        assert!(!sql.contains(" AND "), "{sql}");

        let count = compiled(&node).to_count_sql();
        assert!(count.contains("\"a\" = 1 OR \"b\" = 2"), "{count}");
    }

    #[test]
    fn pattern_operators_render_like() {
        let sql = compiled(&FilterNode::comparison("title", "contains", "rust")).to_sql();
        assert!(sql.contains("LIKE '%rust%'"), "{sql}");

        let sql = compiled(&FilterNode::comparison("title", "notContains", "go")).to_sql();
        assert!(sql.contains("NOT LIKE '%go%'"), "{sql}");
    }

    #[test]
    fn null_and_list_values() {
        let sql = compiled(&FilterNode::comparison("deleted", "equal", FilterValue::Null)).to_sql();
        assert!(sql.contains("\"deleted\" IS NULL"), "{sql}");

        let sql = compiled(&FilterNode::comparison(
            "status",
            "notEqual",
            FilterValue::List(vec!["a".into(), "b".into()]),
        ))
        .to_sql();
        assert!(sql.contains("NOT IN ('a', 'b')"), "{sql}");
    }

    #[test]
    fn ordering_and_window() {
        let mut q = table(SqlBackend::Postgres).new_query();
        q.order_by("age", SortDirection::Desc);
        q.order_by("id", SortDirection::Asc);
        q.skip(10);
        q.take(5);
        let sql = q.to_sql();
        assert!(sql.contains("ORDER BY \"age\" DESC, \"id\" ASC"), "{sql}");
        assert!(sql.contains("LIMIT 5"));
        assert!(sql.contains("OFFSET 10"));
    }

    #[test]
    fn count_ignores_order_and_window() {
        let mut q = compiled(&FilterNode::comparison("age", "greaterThan", 30));
        q.order_by("age", SortDirection::Desc);
        q.take(5);
        let sql = q.to_count_sql();
        assert!(sql.contains("COUNT(*)"));
        assert!(sql.contains("\"age\" > 30"));
        assert!(!sql.contains("ORDER BY"));
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn statements_are_parameterized() {
        let statement = compiled(&FilterNode::comparison("name", "startsWith", "Ann")).statement();
        assert!(statement.sql.contains("$1"), "{}", statement.sql);
        assert!(!statement.sql.contains("Ann"));
        assert_eq!(statement.values.0.len(), 1);

        let mut q = table(SqlBackend::Sqlite).new_query();
        q.where_predicate(
            Predicate {
                field: "age".to_string(),
                comparison: Comparison::Greater,
                value: FilterValue::Integer(30),
            },
            Joiner::And,
        );
        let statement = q.statement();
        assert!(statement.sql.contains('?'), "{}", statement.sql);
    }

    #[test]
    fn unconnected_executor_fails_with_the_statement() {
        let q = compiled(&FilterNode::comparison("age", "lessThan", 3));
        let err = q.get().unwrap_err();
        assert!(err.sql.contains("\"age\" < $1"), "{}", err.sql);
    }

    #[test]
    fn backend_names() {
        assert_eq!(SqlBackend::from_name("Postgres"), Some(SqlBackend::Postgres));
        assert_eq!(SqlBackend::from_name("sqlite"), Some(SqlBackend::Sqlite));
        assert_eq!(SqlBackend::from_name("mysql"), None);
        assert_eq!(SqlBackend::default().as_str(), "postgres");
    }
}
