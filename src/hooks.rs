//! # Lifecycle Hooks
//!
//! Collaborators invoked around a run ([`RunHooks`]) and after every
//! checkpoint ([`AfterBatch`]). Both default to no-op implementations.
//!
//! Run hooks are where a host suspends expensive ambient behaviour for the
//! duration of a bulk task, such as recounting term usage after every write,
//! and restores it afterwards. `after_run` is invoked even when the run fails,
//! including when `before_run` itself fails part way through a [`HookChain`].

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::driver::BatchContext;

/// Pre-run and post-run hooks
#[async_trait]
pub trait RunHooks: Send + Sync + fmt::Debug {
    async fn before_run(&self, task_key: &str) -> anyhow::Result<()>;

    async fn after_run(&self, task_key: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRunHooks;

#[async_trait]
impl RunHooks for NoopRunHooks {
    async fn before_run(&self, _task_key: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn after_run(&self, _task_key: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Defers recounting while a task runs and flushes one recount when it ends.
///
/// Hosts check [`DeferredRecount::is_deferred`] before recounting and call
/// [`DeferredRecount::mark_pending`] instead while it returns true.
#[derive(Debug, Clone, Default)]
pub struct DeferredRecount {
    deferred: Arc<AtomicBool>,
    pending: Arc<AtomicU64>,
    flushes: Arc<AtomicU64>,
}

impl DeferredRecount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred.load(Ordering::SeqCst)
    }

    /// Note a recount that was skipped because counting is deferred
    pub fn mark_pending(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::SeqCst)
    }

    /// Number of times deferred recounts were flushed
    pub fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RunHooks for DeferredRecount {
    async fn before_run(&self, task_key: &str) -> anyhow::Result<()> {
        debug!(task_key, "Deferring recounts");
        self.deferred.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn after_run(&self, task_key: &str) -> anyhow::Result<()> {
        self.deferred.store(false, Ordering::SeqCst);
        let pending = self.pending.swap(0, Ordering::SeqCst);
        if pending > 0 {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            info!(task_key, pending, "Flushing deferred recounts");
        }
        Ok(())
    }
}

/// Switch that suspends side effects (cache invalidation, notifications)
/// while a task runs
#[derive(Debug, Clone, Default)]
pub struct SideEffectPause {
    paused: Arc<AtomicBool>,
}

impl SideEffectPause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RunHooks for SideEffectPause {
    async fn before_run(&self, task_key: &str) -> anyhow::Result<()> {
        debug!(task_key, "Pausing side effects");
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn after_run(&self, task_key: &str) -> anyhow::Result<()> {
        debug!(task_key, "Resuming side effects");
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Several run hooks as one. `before_run` runs in order, `after_run` in
/// reverse; every `after_run` is attempted and the first failure is returned.
#[derive(Debug, Default, Clone)]
pub struct HookChain {
    hooks: Vec<Arc<dyn RunHooks>>,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, hook: Arc<dyn RunHooks>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

#[async_trait]
impl RunHooks for HookChain {
    async fn before_run(&self, task_key: &str) -> anyhow::Result<()> {
        for hook in &self.hooks {
            hook.before_run(task_key).await?;
        }
        Ok(())
    }

    async fn after_run(&self, task_key: &str) -> anyhow::Result<()> {
        let mut first_error = None;
        for hook in self.hooks.iter().rev() {
            if let Err(e) = hook.after_run(task_key).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Invoked once per checkpoint, after the watermark is persisted
#[async_trait]
pub trait AfterBatch: Send {
    async fn after_batch(&mut self, batch: &BatchContext) -> anyhow::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAfterBatch;

#[async_trait]
impl AfterBatch for NoopAfterBatch {
    async fn after_batch(&mut self, _batch: &BatchContext) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Adapter returned by [`after_batch_fn`]
pub struct AfterBatchFn<F> {
    f: F,
}

impl<F> fmt::Debug for AfterBatchFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AfterBatchFn").finish_non_exhaustive()
    }
}

/// Wrap a synchronous closure as an [`AfterBatch`] hook
pub fn after_batch_fn<F>(f: F) -> AfterBatchFn<F>
where
    F: FnMut(&BatchContext) -> anyhow::Result<()> + Send,
{
    AfterBatchFn { f }
}

#[async_trait]
impl<F> AfterBatch for AfterBatchFn<F>
where
    F: FnMut(&BatchContext) -> anyhow::Result<()> + Send,
{
    async fn after_batch(&mut self, batch: &BatchContext) -> anyhow::Result<()> {
        (self.f)(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deferred_recount_flushes_once() {
        let recount = DeferredRecount::new();
        assert!(!recount.is_deferred());

        recount.before_run("terms").await.unwrap();
        assert!(recount.is_deferred());
        recount.mark_pending();
        recount.mark_pending();

        recount.after_run("terms").await.unwrap();
        assert!(!recount.is_deferred());
        assert_eq!(recount.pending(), 0);
        assert_eq!(recount.flushes(), 1);

        // Nothing pending, nothing flushed
        recount.before_run("terms").await.unwrap();
        recount.after_run("terms").await.unwrap();
        assert_eq!(recount.flushes(), 1);
    }

    #[tokio::test]
    async fn test_chain_restores_everything() {
        let pause = SideEffectPause::new();
        let recount = DeferredRecount::new();
        let chain = HookChain::new()
            .with(Arc::new(pause.clone()))
            .with(Arc::new(recount.clone()));
        assert_eq!(chain.len(), 2);

        chain.before_run("posts").await.unwrap();
        assert!(pause.is_paused());
        assert!(recount.is_deferred());

        chain.after_run("posts").await.unwrap();
        assert!(!pause.is_paused());
        assert!(!recount.is_deferred());
    }

    #[derive(Debug)]
    struct FailingHook;

    #[async_trait]
    impl RunHooks for FailingHook {
        async fn before_run(&self, _task_key: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn after_run(&self, _task_key: &str) -> anyhow::Result<()> {
            anyhow::bail!("restore failed")
        }
    }

    #[tokio::test]
    async fn test_chain_attempts_every_after_run() {
        let pause = SideEffectPause::new();
        let chain = HookChain::new()
            .with(Arc::new(pause.clone()))
            .with(Arc::new(FailingHook));

        chain.before_run("posts").await.unwrap();
        let err = chain.after_run("posts").await.unwrap_err();
        assert_eq!(err.to_string(), "restore failed");
        assert!(!pause.is_paused());
    }
}
