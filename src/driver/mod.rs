//! # Batch Driver
//!
//! [`BulkTask`] walks a source in ID windows, hands every record to a
//! callback, and checkpoints the watermark after each window so an
//! interrupted run resumes where it stopped.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle → Initializing → Fetching → Dispatching → Checkpointing ─┬→ Fetching
//!                                                               ├→ Halted ──┐
//!                                                               └→ Exhausted┴→ Finalizing → Idle
//! ```
//!
//! - An empty window advances the watermark by the stepping width.
//! - A non-empty window advances it to the last record's key.
//! - A halt leaves it at the last record the callback completed.
//!
//! The upper bound is read once, when the run starts. Records inserted above
//! it during the run are picked up by the next run.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use tasker_bulk::driver::{callback, BulkTask};
//! use tasker_bulk::query::QueryArgs;
//! use tasker_bulk::record::Record;
//! use tasker_bulk::registry::SourceRegistry;
//! use tasker_bulk::store::MemoryStore;
//!
//! # async fn example() -> tasker_bulk::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let task = BulkTask::new("reindex_posts", SourceRegistry::with_store(store));
//!
//! let outcome = task
//!     .run(
//!         "post",
//!         QueryArgs::new().with("post_status", "publish"),
//!         callback::from_fn(|record: &Record, _ctx: &_| {
//!             println!("{}", record.ordering_key());
//!         }),
//!     )
//!     .await?;
//! println!("stopped at {}", outcome.watermark());
//! # Ok(())
//! # }
//! ```

pub mod callback;
pub mod context;
pub mod outcome;
pub mod state;

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::cache::{CacheReset, NoopCacheReset};
use crate::config::BulkTaskConfig;
use crate::constants::{CURSOR_KEY_PREFIX, DEFAULT_STEPPING};
use crate::cursor::{Cursor, CursorBackend, MemoryCursorBackend};
use crate::error::{BulkTaskError, Result};
use crate::hooks::{AfterBatch, NoopAfterBatch, NoopRunHooks, RunHooks};
use crate::logging::{log_batch_operation, log_error};
use crate::progress::{self, NullProgress, Progress};
use crate::query::QueryArgs;
use crate::registry::SourceRegistry;
use crate::sources::BatchSource;

pub use callback::{Flow, RecordCallback};
pub use context::{BatchContext, FetchContext};
pub use outcome::{RunOutcome, RunSummary};
pub use state::{DriverEvent, DriverState, StateTracker};

/// A named, resumable bulk task
#[derive(Debug, Clone)]
pub struct BulkTask {
    task_key: String,
    registry: Arc<SourceRegistry>,
    cursor_backend: Arc<dyn CursorBackend>,
    cursor_prefix: String,
    progress: Arc<dyn Progress>,
    cache: Arc<dyn CacheReset>,
    hooks: Arc<dyn RunHooks>,
    stepping: i64,
}

impl BulkTask {
    /// A task with an in-memory cursor and no-op collaborators
    pub fn new(task_key: impl Into<String>, registry: SourceRegistry) -> Self {
        Self {
            task_key: task_key.into(),
            registry: Arc::new(registry),
            cursor_backend: Arc::new(MemoryCursorBackend::new()),
            cursor_prefix: CURSOR_KEY_PREFIX.to_string(),
            progress: Arc::new(NullProgress),
            cache: Arc::new(NoopCacheReset),
            hooks: Arc::new(NoopRunHooks),
            stepping: DEFAULT_STEPPING,
        }
    }

    /// Apply engine and progress settings
    pub fn with_config(mut self, config: &BulkTaskConfig) -> Self {
        self.stepping = config.engine.stepping;
        self.cursor_prefix = config.engine.cursor_prefix.clone();
        self.progress = Arc::from(progress::from_mode(config.progress.mode, &self.task_key));
        self
    }

    pub fn with_cursor_backend(mut self, backend: Arc<dyn CursorBackend>) -> Self {
        self.cursor_backend = backend;
        self
    }

    pub fn with_cursor_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cursor_prefix = prefix.into();
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cache_reset(mut self, cache: Arc<dyn CacheReset>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_run_hooks(mut self, hooks: Arc<dyn RunHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Configured stepping; a larger page size still widens the window
    pub fn with_stepping(mut self, stepping: i64) -> Self {
        self.stepping = stepping;
        self
    }

    pub fn task_key(&self) -> &str {
        &self.task_key
    }

    /// The cursor holding this task's watermark
    pub fn cursor(&self) -> Cursor {
        Cursor::with_prefix(
            &self.task_key,
            &self.cursor_prefix,
            self.cursor_backend.clone(),
        )
    }

    /// Run to exhaustion or until the callback halts
    pub async fn run<C>(&self, source_type: &str, args: QueryArgs, callback: C) -> Result<RunOutcome>
    where
        C: RecordCallback,
    {
        self.run_with_after_batch(source_type, args, callback, NoopAfterBatch)
            .await
    }

    /// Like [`BulkTask::run`], invoking `after_batch` after every checkpoint
    pub async fn run_with_after_batch<C, A>(
        &self,
        source_type: &str,
        args: QueryArgs,
        mut callback: C,
        mut after_batch: A,
    ) -> Result<RunOutcome>
    where
        C: RecordCallback,
        A: AfterBatch,
    {
        if self.stepping <= 0 {
            return Err(BulkTaskError::InvalidInput(format!(
                "stepping must be greater than zero, got {}",
                self.stepping
            )));
        }

        let mut state = StateTracker::new();
        state.transition(DriverEvent::Start)?;

        // Resolution must fail before any store or cursor access
        let source = self.registry.resolve(source_type)?;
        let args = source.prepare_args(args);
        let cursor = self.cursor();
        let starting_watermark = cursor.get().await?;
        let max_id = source.max_bound(&args).await?;
        let stepping = self.stepping.max(source.page_size(&args));

        info!(
            task_key = %self.task_key,
            source_type,
            min_id = starting_watermark,
            max_id,
            stepping,
            "Starting bulk task"
        );

        if let Err(e) = self.hooks.before_run(&self.task_key).await {
            let _ = state.transition(DriverEvent::Fail);
            let e = BulkTaskError::hook_failure("before_run", e);
            log_error(
                "BulkTask",
                "before_run",
                &e.to_string(),
                Some(&format!("task_key={}", self.task_key)),
            );
            // Hooks applied before the failing one are still restored
            self.restore_after_failure().await;
            return Err(e);
        }
        self.progress.set_total(max_id);

        let mut run = Run {
            source: source.as_ref(),
            cursor: &cursor,
            args: &args,
            stepping,
            summary: RunSummary {
                task_key: self.task_key.clone(),
                source_type: source_type.to_string(),
                starting_watermark,
                watermark: starting_watermark,
                max_id,
                windows: 0,
                records: 0,
                path: Vec::new(),
            },
            halted: false,
        };

        let driven = self
            .drive(&mut run, &mut state, &mut callback, &mut after_batch)
            .await;
        match driven {
            Ok(()) => self.finalize(run, state).await,
            Err(e) => {
                let _ = state.transition(DriverEvent::Fail);
                log_error(
                    "BulkTask",
                    "run",
                    &e.to_string(),
                    Some(&format!(
                        "task_key={} watermark={}",
                        self.task_key, run.summary.watermark
                    )),
                );
                // Deferred behaviours are restored even though the run failed
                self.restore_after_failure().await;
                Err(e)
            }
        }
    }

    /// Run `after_run` on a failed run; its own failure is logged, not returned
    async fn restore_after_failure(&self) {
        if let Err(hook_error) = self.hooks.after_run(&self.task_key).await {
            error!(
                task_key = %self.task_key,
                error = %hook_error,
                "after_run hook failed while handling a fatal error"
            );
        }
    }

    async fn drive<C, A>(
        &self,
        run: &mut Run<'_>,
        state: &mut StateTracker,
        callback: &mut C,
        after_batch: &mut A,
    ) -> Result<()>
    where
        C: RecordCallback,
        A: AfterBatch,
    {
        if run.summary.watermark >= run.summary.max_id {
            debug!(
                task_key = %self.task_key,
                watermark = run.summary.watermark,
                max_id = run.summary.max_id,
                "Nothing to do"
            );
            state.transition(DriverEvent::Exhaust)?;
            return Ok(());
        }
        state.transition(DriverEvent::Initialized)?;

        loop {
            let window_start = run.summary.watermark;
            run.summary.windows += 1;

            let batch = run
                .source
                .fetch_window(window_start, run.stepping, run.args)
                .await?;
            let next = run.source.advance(window_start, run.stepping, &batch)?;
            state.transition(DriverEvent::Fetched(batch.len()))?;

            let mut completed = 0usize;
            let mut watermark = next;
            if !batch.is_empty() {
                let mut context = FetchContext {
                    source_type: run.summary.source_type.clone(),
                    token: batch.token,
                    range: batch.range,
                    query_args: batch.query_args.clone(),
                    window: run.summary.windows,
                    index: 0,
                    batch_len: batch.len(),
                };

                let mut last_completed = window_start;
                for (index, record) in batch.records.iter().enumerate() {
                    context.index = index;
                    let key = record.ordering_key();
                    let flow = callback
                        .call(record, &context)
                        .await
                        .map_err(|e| BulkTaskError::callback_failure(key, e))?;
                    if flow.is_halt() {
                        info!(task_key = %self.task_key, ordering_key = key, "Callback halted the run");
                        run.halted = true;
                        break;
                    }
                    last_completed = key;
                    completed += 1;
                }

                if run.halted {
                    watermark = last_completed;
                }
                state.transition(DriverEvent::Dispatched)?;
            }

            run.summary.watermark = watermark;
            run.summary.records += completed as u64;
            self.checkpoint(run, completed, after_batch).await?;

            if run.halted {
                state.transition(DriverEvent::Halt)?;
                return Ok(());
            }
            if run.summary.watermark >= run.summary.max_id {
                state.transition(DriverEvent::Exhaust)?;
                return Ok(());
            }
            state.transition(DriverEvent::Continue)?;
        }
    }

    async fn checkpoint<A>(&self, run: &Run<'_>, completed: usize, after_batch: &mut A) -> Result<()>
    where
        A: AfterBatch,
    {
        let watermark = run.summary.watermark;
        run.cursor.set(watermark).await?;
        self.cache.reset();
        self.progress.set_current(watermark);

        log_batch_operation(
            &self.task_key,
            &run.summary.source_type,
            run.summary.windows,
            watermark,
            run.summary.max_id,
            completed,
        );

        let batch = BatchContext {
            task_key: self.task_key.clone(),
            source_type: run.summary.source_type.clone(),
            min_id: watermark,
            max_id: run.summary.max_id,
            window: run.summary.windows,
            records: completed,
            halted: run.halted,
        };
        after_batch
            .after_batch(&batch)
            .await
            .map_err(|e| BulkTaskError::hook_failure("after_batch", e))
    }

    async fn finalize(&self, run: Run<'_>, mut state: StateTracker) -> Result<RunOutcome> {
        state.transition(DriverEvent::Finalize)?;

        let live = run.source.live_predicates();
        if live > 0 {
            warn!(
                task_key = %self.task_key,
                live,
                "Scoped predicates still registered after the run"
            );
        }

        self.hooks
            .after_run(&self.task_key)
            .await
            .map_err(|e| BulkTaskError::hook_failure("after_run", e))?;
        self.progress.set_finished();
        state.transition(DriverEvent::Finish)?;

        let halted = run.halted;
        let mut summary = run.summary;
        summary.path = state.history().to_vec();

        info!(
            task_key = %self.task_key,
            source_type = %summary.source_type,
            watermark = summary.watermark,
            windows = summary.windows,
            records = summary.records,
            halted,
            "Bulk task finished"
        );

        Ok(if halted {
            RunOutcome::Halted(summary)
        } else {
            RunOutcome::Completed(summary)
        })
    }
}

/// Mutable state of one invocation
struct Run<'a> {
    source: &'a dyn BatchSource,
    cursor: &'a Cursor,
    args: &'a QueryArgs,
    stepping: i64,
    summary: RunSummary,
    halted: bool,
}
