//! Scoped range predicates.
//!
//! A store consults its [`PredicateScope`] every time it executes a
//! [`RecordQuery`](super::RecordQuery). A range predicate is only applied when the
//! query's [`ScopeToken`] is registered, so queries a callback issues while a
//! batch is being dispatched are never windowed by accident.

use std::fmt;

use dashmap::DashMap;
use tracing::trace;
use uuid::Uuid;

use super::IdRange;

/// Identity of one query instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeToken(Uuid);

impl ScopeToken {
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ScopeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry of live range predicates, keyed by the token they apply to
#[derive(Debug, Default)]
pub struct PredicateScope {
    live: DashMap<ScopeToken, IdRange>,
}

impl PredicateScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `range` apply to the query identified by `token` until the guard drops
    pub fn register(&self, token: ScopeToken, range: IdRange) -> ScopeGuard<'_> {
        trace!(%token, after = range.after, up_to = range.up_to, "Registering scoped predicate");
        self.live.insert(token, range);
        ScopeGuard { scope: self, token }
    }

    /// The predicate to inject into the query carrying `token`, if any
    pub fn predicate_for(&self, token: ScopeToken) -> Option<IdRange> {
        self.live.get(&token).map(|entry| *entry.value())
    }

    pub fn is_live(&self, token: ScopeToken) -> bool {
        self.live.contains_key(&token)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    fn unregister(&self, token: ScopeToken) {
        trace!(%token, "Unregistering scoped predicate");
        self.live.remove(&token);
    }
}

/// Unregisters its token on drop
#[must_use = "the predicate is unregistered as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ScopeGuard<'a> {
    scope: &'a PredicateScope,
    token: ScopeToken,
}

impl ScopeGuard<'_> {
    pub fn token(&self) -> ScopeToken {
        self.token
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.scope.unregister(self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_only_applies_to_registered_token() {
        let scope = PredicateScope::new();
        let windowed = ScopeToken::mint();
        let unrelated = ScopeToken::mint();

        let guard = scope.register(windowed, IdRange::new(100, 50));
        assert_eq!(scope.predicate_for(windowed), Some(IdRange::new(100, 50)));
        assert_eq!(scope.predicate_for(unrelated), None);
        assert_eq!(guard.token(), windowed);
        assert_eq!(scope.live_count(), 1);

        drop(guard);
        assert!(!scope.is_live(windowed));
        assert_eq!(scope.live_count(), 0);
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(ScopeToken::mint(), ScopeToken::mint());
    }
}
