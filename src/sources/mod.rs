//! # Batch Sources
//!
//! One adapter per record shape. A source knows its upper bound, how to run a
//! single windowed fetch, and how to derive the next watermark from it.
//!
//! Store-backed sources ([`PostSource`], [`TermSource`], [`UserSource`]) build
//! a fresh [`RecordQuery`] per fetch and register its token with the store's
//! [`PredicateScope`](crate::query::PredicateScope) only for the duration of
//! that fetch. [`CsvSource`] reads a flat file and keys rows by line number.

pub mod csv;
pub mod posts;
pub mod terms;
pub mod users;

use std::fmt;

use async_trait::async_trait;

use crate::error::{BulkTaskError, Result};
use crate::query::{IdRange, QueryArgs, RecordQuery, ScopeToken};
use crate::record::Record;
use crate::store::RecordStore;

pub use self::csv::CsvSource;
pub use posts::PostSource;
pub use terms::TermSource;
pub use users::UserSource;

/// Records from one windowed fetch
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// In ascending ordering-key order
    pub records: Vec<Record>,
    /// Token of the query that produced the batch, already unregistered
    pub token: Option<ScopeToken>,
    pub range: IdRange,
    pub query_args: QueryArgs,
}

impl BatchResult {
    pub fn last_key(&self) -> Option<i64> {
        self.records.last().map(Record::ordering_key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
pub trait BatchSource: Send + Sync + fmt::Debug {
    /// Name the registry resolves this source by
    fn source_type(&self) -> &'static str;

    /// Merge the caller's arguments with this source's defaults, then apply
    /// the keys this source always forces
    fn prepare_args(&self, args: QueryArgs) -> QueryArgs;

    /// Page size requested by prepared `args`; zero or less means unlimited
    fn page_size(&self, args: &QueryArgs) -> i64;

    /// Current maximum ordering key, read once per run
    async fn max_bound(&self, args: &QueryArgs) -> Result<i64>;

    /// Exactly one fetch constrained to `(min_id, min_id + stepping]`
    async fn fetch_window(&self, min_id: i64, stepping: i64, args: &QueryArgs)
        -> Result<BatchResult>;

    /// Range predicates still registered with this source's store
    fn live_predicates(&self) -> usize {
        0
    }

    /// Next watermark after `batch`.
    ///
    /// An empty window skips ahead by `stepping`. Otherwise the watermark is
    /// the last record's key, which must fall inside the window so every
    /// iteration makes progress.
    fn advance(&self, min_id: i64, stepping: i64, batch: &BatchResult) -> Result<i64> {
        let Some(last_key) = batch.last_key() else {
            return Ok(min_id.saturating_add(stepping));
        };

        let window = IdRange::new(min_id, stepping);
        if !window.contains(last_key) {
            return Err(BulkTaskError::InvalidInput(format!(
                "{} fetch returned key {last_key} outside window ({}, {}]",
                self.source_type(),
                window.after,
                window.up_to
            )));
        }
        Ok(last_key)
    }
}

/// Run `query` with `range` injected for its token only.
///
/// The guard is dropped as soon as the store returns, so nothing issued
/// afterwards (including queries made by the record callback) sees the range.
pub(crate) async fn fetch_scoped(
    store: &dyn RecordStore,
    source_type: &str,
    query: RecordQuery,
    range: IdRange,
) -> Result<BatchResult> {
    let records = {
        let _guard = store.scope().register(query.token(), range);
        store.execute(&query).await
    }
    .map_err(|e| BulkTaskError::store_unavailable(source_type, e))?;

    Ok(BatchResult {
        records,
        token: Some(query.token()),
        range,
        query_args: query.args().clone(),
    })
}
