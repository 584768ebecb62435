#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Tasker Bulk
//!
//! Resumable, memory-bounded batch processing over very large, ID-ordered
//! record collections.
//!
//! ## Overview
//!
//! A bulk task walks a collection in windows of ordering keys rather than
//! offsets. After every window the last processed key is persisted, so a run
//! that is interrupted (or asked to stop by its callback) resumes exactly
//! where it left off. Per-process caches are reset between windows to keep
//! memory flat no matter how many records are visited.
//!
//! ## Key Features
//!
//! - **Windowed Pagination**: `(watermark, watermark + stepping]` ranges with
//!   skip-ahead over sparse key space
//! - **Exact Resumability**: the watermark only moves past records the
//!   callback completed
//! - **Scoped Predicates**: the window is injected into one query instance
//!   only, never into queries the callback issues
//! - **Several Record Shapes**: posts, taxonomy terms, users and CSV rows
//! - **Lifecycle Hooks**: pre-run deferral, post-batch callbacks, post-run
//!   restore
//!
//! ## Module Organization
//!
//! - [`driver`] - The [`BulkTask`] state machine and callback contract
//! - [`sources`] - Per-shape batch source adapters
//! - [`registry`] - Source lookup by name
//! - [`store`] - In-memory and PostgreSQL record stores
//! - [`query`] - Query objects, ID windows and predicate scoping
//! - [`cursor`] - Watermark persistence
//! - [`progress`] - Progress reporters
//! - [`hooks`] - Run and batch lifecycle hooks
//! - [`cache`] - Ambient cache reset
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tasker_bulk::driver::callback;
//! use tasker_bulk::{BulkTask, QueryArgs, Record, SourceRegistry};
//! use tasker_bulk::store::MemoryStore;
//!
//! # async fn example() -> tasker_bulk::Result<()> {
//! let registry = SourceRegistry::with_store(Arc::new(MemoryStore::new()));
//! let task = BulkTask::new("backfill_slugs", registry);
//!
//! let outcome = task
//!     .run("term", QueryArgs::new(), callback::from_fn(|record: &Record, _ctx: &_| {
//!         record.as_term().is_some()
//!     }))
//!     .await?;
//! std::process::exit(outcome.exit_code());
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod cursor;
pub mod database;
pub mod driver;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod progress;
pub mod query;
pub mod record;
pub mod registry;
pub mod sources;
pub mod store;

pub use config::{BulkTaskConfig, ConfigLoader};
pub use cursor::Cursor;
pub use driver::{BatchContext, BulkTask, FetchContext, Flow, RecordCallback, RunOutcome};
pub use error::{BulkTaskError, Result};
pub use query::QueryArgs;
pub use record::Record;
pub use registry::SourceRegistry;
