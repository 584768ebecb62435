//! # Ambient Cache Reset
//!
//! Long-running tasks accumulate per-request state (query logs, object caches)
//! that nothing else clears. The driver resets it once per completed window.

use std::fmt;

use parking_lot::Mutex;

/// A cheap, idempotent reset of process-wide caches
pub trait CacheReset: Send + Sync + fmt::Debug {
    fn reset(&self);
}

/// Headless default
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCacheReset;

impl CacheReset for NoopCacheReset {
    fn reset(&self) {}
}

/// In-process log of executed queries, the kind of state that grows without
/// bound during a bulk task unless something resets it.
#[derive(Debug, Default)]
pub struct QueryLog {
    entries: Mutex<Vec<String>>,
    resets: Mutex<u64>,
}

impl QueryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Number of times [`CacheReset::reset`] has been called
    pub fn reset_count(&self) -> u64 {
        *self.resets.lock()
    }
}

impl CacheReset for QueryLog {
    fn reset(&self) {
        self.entries.lock().clear();
        *self.resets.lock() += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_log_reset_is_idempotent() {
        let log = QueryLog::new();
        log.record("SELECT 1");
        log.record("SELECT 2");
        assert_eq!(log.len(), 2);

        log.reset();
        log.reset();
        assert!(log.is_empty());
        assert_eq!(log.reset_count(), 2);
    }
}
