//! Gridquery Kernel Library
//!
//! Translates declarative data-grid requests (filter tree, sort list,
//! skip/take, total count) into queries and shapes the results.
//! The `gridquery` binary wraps the library for command-line use.

pub mod config;
pub mod error;
pub mod query;

pub use error::{Phase, QueryError, QueryResult};
