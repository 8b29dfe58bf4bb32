//! Grid query translator.
//!
//! This module provides:
//! - Operator registry: client operator names to comparisons
//! - Filter, sort and pagination compilers over a [`Queryable`]
//! - QueryOrchestrator: page fetch plus independent total count
//! - Backends: in-memory JSON records and SeaQuery-rendered SQL
//! - Types: QueryRequest, FilterNode, SortSpec, ResultEnvelope, etc.

pub mod filter;
pub mod memory;
pub mod operators;
pub mod orchestrator;
pub mod pagination;
mod parser;
pub mod queryable;
pub mod result;
pub mod sort;
pub mod sql;
pub mod types;

pub use memory::{MemoryQuery, MemoryTable};
pub use operators::{Comparison, Operator, Wildcard};
pub use orchestrator::{PreparedQuery, QueryOptions, QueryOrchestrator, execute};
pub use parser::parse_filter;
pub use queryable::{Clause, Model, Predicate, Queryable, WhereClause};
pub use sql::{
    NotConnected, SqlBackend, SqlExecutor, SqlQuery, SqlStatement, SqlTable, Unconnected,
};
pub use types::{
    FilterNode, FilterValue, Joiner, PageWindow, QueryRequest, ResultEnvelope, SortDirection,
    SortSpec,
};
