//! The per-record callback contract.
//!
//! Implement [`RecordCallback`] directly for stateful or async callbacks, or
//! wrap a closure with [`from_fn`]. A closure may return `()`, `bool`,
//! [`Flow`], or an `anyhow::Result` of any of those; `false` and
//! [`Flow::Halt`] stop the run.

use std::fmt;
use std::marker::PhantomData;

use async_trait::async_trait;

use super::FetchContext;
use crate::record::Record;

/// Whether the driver should keep dispatching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    #[default]
    Continue,
    Halt,
}

impl Flow {
    pub fn is_halt(&self) -> bool {
        matches!(self, Self::Halt)
    }
}

impl From<bool> for Flow {
    fn from(keep_going: bool) -> Self {
        if keep_going {
            Self::Continue
        } else {
            Self::Halt
        }
    }
}

#[async_trait]
pub trait RecordCallback: Send {
    /// Process one record. An error aborts the run without advancing the
    /// watermark past the last checkpoint.
    async fn call(&mut self, record: &Record, context: &FetchContext) -> anyhow::Result<Flow>;
}

#[async_trait]
impl<C> RecordCallback for &mut C
where
    C: RecordCallback + ?Sized,
{
    async fn call(&mut self, record: &Record, context: &FetchContext) -> anyhow::Result<Flow> {
        (**self).call(record, context).await
    }
}

#[async_trait]
impl RecordCallback for Box<dyn RecordCallback> {
    async fn call(&mut self, record: &Record, context: &FetchContext) -> anyhow::Result<Flow> {
        self.as_mut().call(record, context).await
    }
}

/// Return types a closure callback may produce
pub trait IntoDispatch {
    fn into_dispatch(self) -> anyhow::Result<Flow>;
}

impl IntoDispatch for () {
    fn into_dispatch(self) -> anyhow::Result<Flow> {
        Ok(Flow::Continue)
    }
}

impl IntoDispatch for bool {
    fn into_dispatch(self) -> anyhow::Result<Flow> {
        Ok(self.into())
    }
}

impl IntoDispatch for Flow {
    fn into_dispatch(self) -> anyhow::Result<Flow> {
        Ok(self)
    }
}

impl<T: IntoDispatch> IntoDispatch for anyhow::Result<T> {
    fn into_dispatch(self) -> anyhow::Result<Flow> {
        self.and_then(IntoDispatch::into_dispatch)
    }
}

/// Adapter returned by [`from_fn`]
pub struct FnCallback<F, R> {
    f: F,
    _returns: PhantomData<fn() -> R>,
}

impl<F, R> fmt::Debug for FnCallback<F, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCallback").finish_non_exhaustive()
    }
}

pub fn from_fn<F, R>(f: F) -> FnCallback<F, R>
where
    F: FnMut(&Record, &FetchContext) -> R + Send,
    R: IntoDispatch,
{
    FnCallback {
        f,
        _returns: PhantomData,
    }
}

#[async_trait]
impl<F, R> RecordCallback for FnCallback<F, R>
where
    F: FnMut(&Record, &FetchContext) -> R + Send,
    R: IntoDispatch,
{
    async fn call(&mut self, record: &Record, context: &FetchContext) -> anyhow::Result<Flow> {
        (self.f)(record, context).into_dispatch()
    }
}
