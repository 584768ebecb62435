use serde::Serialize;

use crate::query::{IdRange, QueryArgs, ScopeToken};

/// What the callback can see about the fetch that produced a record.
///
/// The token identifies a query that has already been torn down; it is
/// exposed for introspection only and no longer windows anything.
#[derive(Debug, Clone, Serialize)]
pub struct FetchContext {
    pub source_type: String,
    /// `None` for sources that do not go through a record store
    #[serde(skip)]
    pub token: Option<ScopeToken>,
    pub range: IdRange,
    /// Effective arguments after defaults and forced keys were merged
    pub query_args: QueryArgs,
    /// 1-based window number within this run
    pub window: u64,
    /// Position of the record within its batch
    pub index: usize,
    /// Records in the batch
    pub batch_len: usize,
}

impl FetchContext {
    pub fn is_last_in_batch(&self) -> bool {
        self.index + 1 == self.batch_len
    }
}

/// Passed to the after-batch hook once the watermark is persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchContext {
    pub task_key: String,
    pub source_type: String,
    /// Watermark as persisted by this checkpoint
    pub min_id: i64,
    /// Upper bound snapshotted at the start of the run
    pub max_id: i64,
    pub window: u64,
    /// Records the callback completed in this window
    pub records: usize,
    pub halted: bool,
}

impl BatchContext {
    pub fn is_final(&self) -> bool {
        self.halted || self.min_id >= self.max_id
    }
}
