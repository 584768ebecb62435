//! # Bulk Task CLI
//!
//! Inspect and reset task cursors, and export any registered source as JSON
//! lines. Exit codes: 0 completed, 2 halted, 64 usage errors, 1 other failures.

use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::error;

use tasker_bulk::config::{BulkTaskConfig, ConfigLoader};
use tasker_bulk::constants::exit_codes;
use tasker_bulk::cursor::{CursorBackend, MemoryCursorBackend, PgCursorBackend};
use tasker_bulk::database::{ensure_schema, DatabaseConnection};
use tasker_bulk::driver::{callback, Flow};
use tasker_bulk::logging::init_structured_logging;
use tasker_bulk::store::{MemoryStore, PgStore, RecordStore};
use tasker_bulk::{BulkTask, BulkTaskError, FetchContext, QueryArgs, Record, SourceRegistry};

#[derive(Parser)]
#[command(name = "bulk-task")]
#[command(about = "Run and inspect resumable bulk tasks")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration directory path (default: config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Environment overlay to load (default: TASKER_ENV, APP_ENV or development)
    #[arg(short, long)]
    environment: Option<String>,

    /// Use in-process stores and cursors instead of PostgreSQL
    #[arg(long)]
    memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read, write or clear a task's watermark
    Cursor {
        #[command(subcommand)]
        action: CursorAction,
    },

    /// Run a task, writing every record to stdout as one JSON line
    Export {
        #[arg(short, long)]
        task_key: String,

        /// Source type (post, term, user, csv)
        #[arg(short, long)]
        source: String,

        /// Query argument as key=value; values are parsed as JSON when possible
        #[arg(short, long = "arg", value_parser = parse_query_arg)]
        args: Vec<(String, Value)>,

        /// Halt after this many records
        #[arg(short, long)]
        limit: Option<u64>,
    },

    /// List registered source types
    Sources,
}

#[derive(Subcommand)]
pub enum CursorAction {
    Get {
        task_key: String,
    },
    Set {
        task_key: String,
        value: i64,
    },
    Reset {
        task_key: String,
    },
}

fn parse_query_arg(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Store and cursor backend for this invocation
async fn collaborators(
    cli: &Cli,
    config: &BulkTaskConfig,
) -> tasker_bulk::Result<(Arc<dyn RecordStore>, Arc<dyn CursorBackend>)> {
    if cli.memory {
        return Ok((
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryCursorBackend::new()),
        ));
    }

    let db = DatabaseConnection::connect(&config.database).await?;
    ensure_schema(db.pool(), &config.database.table_prefix)
        .await
        .map_err(|e| BulkTaskError::store_unavailable("database", e))?;

    Ok((
        Arc::new(PgStore::new(db.pool().clone(), config.database.table_prefix.clone())),
        Arc::new(PgCursorBackend::new(db.pool().clone(), &config.database.table_prefix)),
    ))
}

async fn execute(cli: Cli) -> tasker_bulk::Result<i32> {
    let config = match &cli.environment {
        Some(environment) => {
            ConfigLoader::load_from_directory_with_env(cli.config_dir.clone(), environment)?
        }
        None => ConfigLoader::load_from_directory(cli.config_dir.clone())?,
    };
    config.validate()?;

    let (store, cursor_backend) = collaborators(&cli, &config).await?;
    let registry = SourceRegistry::from_config(store, &config.engine);

    match &cli.command {
        Commands::Sources => {
            for name in registry.names() {
                println!("{name}");
            }
            Ok(exit_codes::COMPLETED)
        }

        Commands::Cursor { action } => {
            let task_key = match action {
                CursorAction::Get { task_key }
                | CursorAction::Set { task_key, .. }
                | CursorAction::Reset { task_key } => task_key,
            };
            let cursor = BulkTask::new(task_key.as_str(), registry)
                .with_config(&config)
                .with_cursor_backend(cursor_backend)
                .cursor();

            match action {
                CursorAction::Get { .. } => println!("{}", cursor.get().await?),
                CursorAction::Set { value, .. } => {
                    cursor.set(*value).await?;
                    println!("{value}");
                }
                CursorAction::Reset { .. } => {
                    let existed = cursor.reset().await?;
                    println!("{}", if existed { "reset" } else { "unset" });
                }
            }
            Ok(exit_codes::COMPLETED)
        }

        Commands::Export {
            task_key,
            source,
            args,
            limit,
        } => {
            let query_args = args
                .iter()
                .fold(QueryArgs::new(), |acc, (key, value)| acc.with(key, value.clone()));
            let task = BulkTask::new(task_key.as_str(), registry)
                .with_config(&config)
                .with_cursor_backend(cursor_backend);

            let limit = limit.unwrap_or(u64::MAX);
            let mut written = 0u64;
            let stdout = std::io::stdout();
            let outcome = task
                .run(
                    source,
                    query_args,
                    callback::from_fn(|record: &Record, _: &FetchContext| -> anyhow::Result<Flow> {
                        if written >= limit {
                            return Ok(Flow::Halt);
                        }
                        let mut out = stdout.lock();
                        serde_json::to_writer(&mut out, record)?;
                        out.write_all(b"\n")?;
                        written += 1;
                        Ok(Flow::Continue)
                    }),
                )
                .await?;

            eprintln!(
                "{}",
                serde_json::to_string(&outcome).unwrap_or_else(|_| format!("{outcome:?}"))
            );
            Ok(outcome.exit_code())
        }
    }
}

#[tokio::main]
async fn main() {
    init_structured_logging();
    let cli = Cli::parse();

    let code = match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "bulk task failed");
            eprintln!("Error: {e}");
            e.exit_code()
        }
    };
    process::exit(code);
}
