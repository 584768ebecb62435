//! # Record Queries
//!
//! The query object a source hands to a store, the half-open ID window the
//! driver pages through, and the token-scoped mechanism that injects that
//! window into exactly one query instance.

pub mod args;
pub mod scope;

use serde::{Deserialize, Serialize};

use crate::record::RecordShape;

pub use args::QueryArgs;
pub use scope::{PredicateScope, ScopeGuard, ScopeToken};

/// Ordering-key range `(after, up_to]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRange {
    pub after: i64,
    pub up_to: i64,
}

impl IdRange {
    /// The window starting just past `min_id` and spanning `stepping` keys
    pub fn new(min_id: i64, stepping: i64) -> Self {
        Self {
            after: min_id,
            up_to: min_id.saturating_add(stepping),
        }
    }

    pub fn contains(&self, key: i64) -> bool {
        key > self.after && key <= self.up_to
    }
}

/// One query instance against a record store.
///
/// Every instance gets its own [`ScopeToken`]. Results always come back in
/// ascending ordering-key order; `limit` of `None` means no page size.
#[derive(Debug, Clone)]
pub struct RecordQuery {
    token: ScopeToken,
    shape: RecordShape,
    args: QueryArgs,
    limit: Option<i64>,
}

impl RecordQuery {
    pub fn new(shape: RecordShape, args: QueryArgs) -> Self {
        Self {
            token: ScopeToken::mint(),
            shape,
            args,
            limit: None,
        }
    }

    /// Page size; zero or negative values mean unlimited
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }

    pub fn token(&self) -> ScopeToken {
        self.token
    }

    pub fn shape(&self) -> RecordShape {
        self.shape
    }

    pub fn args(&self) -> &QueryArgs {
        &self.args
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_is_half_open() {
        let range = IdRange::new(100, 50);
        assert!(!range.contains(100));
        assert!(range.contains(101));
        assert!(range.contains(150));
        assert!(!range.contains(151));
    }

    #[test]
    fn test_range_saturates() {
        let range = IdRange::new(i64::MAX - 1, 10);
        assert_eq!(range.up_to, i64::MAX);
    }

    #[test]
    fn test_each_query_has_its_own_token() {
        let a = RecordQuery::new(RecordShape::Post, QueryArgs::new());
        let b = RecordQuery::new(RecordShape::Post, QueryArgs::new());
        assert_ne!(a.token(), b.token());
        assert_eq!(a.clone().with_limit(0).limit(), None);
        assert_eq!(a.with_limit(100).limit(), Some(100));
    }
}
