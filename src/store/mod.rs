//! # Record Stores
//!
//! The query engines the store-backed sources page through. A store executes
//! [`RecordQuery`] instances, applying a range predicate only when the query's
//! token is live in the store's [`PredicateScope`].
//!
//! - [`MemoryStore`]: in-process tables, used headless and in tests
//! - [`PgStore`]: PostgreSQL tables via SQLx

pub mod memory;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::query::{PredicateScope, RecordQuery};
use crate::record::{Record, RecordShape};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Query execution API shared by every store
#[async_trait]
pub trait RecordStore: Send + Sync + fmt::Debug {
    /// Predicates registered here are injected into matching queries
    fn scope(&self) -> &PredicateScope;

    /// Current maximum ordering key for `shape`, 0 when empty
    async fn max_key(&self, shape: RecordShape) -> Result<i64, StoreError>;

    /// Run one query, returning records in ascending ordering-key order
    async fn execute(&self, query: &RecordQuery) -> Result<Vec<Record>, StoreError>;
}
