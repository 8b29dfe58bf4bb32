//! Gridquery CLI
//!
//! Runs grid requests against JSON record files and prints the SQL they
//! compile to.
//!
//! Usage:
//!   gridquery run --data rows.json --request request.json
//!   gridquery sql --backend sqlite --table people < request.json

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use gridquery_kernel::config::Config;
use gridquery_kernel::query::{
    MemoryTable, QueryOptions, QueryOrchestrator, QueryRequest, SqlBackend, SqlTable, Unconnected,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a request against a JSON array of records.
    Run {
        /// JSON file holding an array of record objects.
        #[arg(long)]
        data: PathBuf,

        /// Request file. Read from stdin when omitted.
        #[arg(long)]
        request: Option<PathBuf>,

        /// Maximum rows per page, overriding GRIDQUERY_MAX_TAKE.
        #[arg(long)]
        max_take: Option<u64>,

        /// Pretty-print the response.
        #[arg(long)]
        pretty: bool,
    },

    /// Print the SQL a request compiles to, without running it.
    Sql {
        /// SQL dialect: postgres or sqlite.
        #[arg(long, value_parser = parse_backend)]
        backend: Option<SqlBackend>,

        /// Table to select from.
        #[arg(long)]
        table: Option<String>,

        /// Request file. Read from stdin when omitted.
        #[arg(long)]
        request: Option<PathBuf>,

        /// Maximum rows per page, overriding GRIDQUERY_MAX_TAKE.
        #[arg(long)]
        max_take: Option<u64>,
    },
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;

    match cli.command {
        Command::Run {
            data,
            request,
            max_take,
            pretty,
        } => run(&config, &data, request.as_deref(), max_take, pretty),
        Command::Sql {
            backend,
            table,
            request,
            max_take,
        } => {
            let backend = backend.unwrap_or(config.sql_backend);
            let table = table.unwrap_or_else(|| config.table.clone());
            sql(&config, backend, &table, request.as_deref(), max_take)
        }
    }
}

fn run(
    config: &Config,
    data: &Path,
    request: Option<&Path>,
    max_take: Option<u64>,
    pretty: bool,
) -> Result<()> {
    let text = fs::read_to_string(data)
        .with_context(|| format!("failed to read records from {}", data.display()))?;
    let rows: Vec<Value> = serde_json::from_str(&text)
        .with_context(|| format!("{} must hold a JSON array of records", data.display()))?;
    info!(rows = rows.len(), path = %data.display(), "records loaded");

    let request = read_request(request)?;
    let orchestrator = QueryOrchestrator::new(options(config, max_take));
    let envelope = orchestrator
        .execute(&MemoryTable::new(rows), &request)
        .context("grid request failed")?;

    let output = if pretty {
        serde_json::to_string_pretty(&envelope)
    } else {
        serde_json::to_string(&envelope)
    }
    .context("failed to serialize response")?;
    println!("{output}");
    Ok(())
}

fn sql(
    config: &Config,
    backend: SqlBackend,
    table: &str,
    request: Option<&Path>,
    max_take: Option<u64>,
) -> Result<()> {
    let request = read_request(request)?;
    let orchestrator = QueryOrchestrator::new(options(config, max_take));
    let prepared = orchestrator
        .prepare(&SqlTable::new(table, backend, Unconnected), &request)
        .context("grid request failed")?;

    info!(backend = backend.as_str(), table, "rendering statements");
    println!("{};", prepared.page.to_sql());
    if let Some(count) = prepared.count {
        println!("{};", count.to_count_sql());
    }
    Ok(())
}

fn options(config: &Config, max_take: Option<u64>) -> QueryOptions {
    let mut options = config.query_options();
    if let Some(max) = max_take {
        options.max_take = (max > 0).then_some(max);
    }
    options
}

fn read_request(path: Option<&Path>) -> Result<QueryRequest> {
    let text = match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read request from {}", path.display()))?,
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read request from stdin")?;
            text
        }
    };
    QueryRequest::from_json(&text).context("invalid grid request")
}

fn parse_backend(name: &str) -> Result<SqlBackend> {
    SqlBackend::from_name(name).ok_or_else(|| anyhow!("unknown backend {name:?}"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}
