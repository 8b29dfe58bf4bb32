//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result, anyhow};

use crate::query::{QueryOptions, SqlBackend};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// SQL dialect for rendered statements (default: postgres).
    pub sql_backend: SqlBackend,

    /// Table queried by the `sql` command (default: items).
    pub table: String,

    /// Maximum rows per page. Unset means no cap.
    pub max_take: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sql_backend: SqlBackend::Postgres,
            table: "items".to_string(),
            max_take: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sql_backend = match lookup("GRIDQUERY_SQL_BACKEND") {
            Some(name) => SqlBackend::from_name(&name).ok_or_else(|| {
                anyhow!("GRIDQUERY_SQL_BACKEND must be postgres or sqlite, got {name:?}")
            })?,
            None => SqlBackend::Postgres,
        };

        let table = lookup("GRIDQUERY_TABLE")
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "items".to_string());

        let max_take = lookup("GRIDQUERY_MAX_TAKE")
            .map(|v| v.trim().parse::<u64>())
            .transpose()
            .context("GRIDQUERY_MAX_TAKE must be a valid u64")?
            .filter(|max| *max > 0);

        Ok(Self {
            sql_backend,
            table,
            max_take,
        })
    }

    /// Orchestrator options derived from this configuration.
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            max_take: self.max_take,
        }
    }
}
