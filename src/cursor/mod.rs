//! # Cursor
//!
//! The persisted watermark of a bulk task. A [`Cursor`] is a thin typed
//! accessor over a key/value [`CursorBackend`]: it namespaces the task key,
//! coerces whatever was stored into a non-negative integer, and never treats a
//! missing key as an error.
//!
//! Callers must not run two tasks against the same key at once; the cursor
//! does no locking.

pub mod memory;
pub mod postgres;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::constants::CURSOR_KEY_PREFIX;
use crate::error::{BulkTaskError, Result, StoreError};

pub use memory::MemoryCursorBackend;
pub use postgres::PgCursorBackend;

/// Key/value persistence for cursor values
#[async_trait]
pub trait CursorBackend: Send + Sync + fmt::Debug {
    /// Raw stored value, `None` when unset
    async fn load(&self, key: &str) -> std::result::Result<Option<String>, StoreError>;

    async fn save(&self, key: &str, value: i64) -> std::result::Result<bool, StoreError>;

    /// Returns false when there was nothing to delete
    async fn delete(&self, key: &str) -> std::result::Result<bool, StoreError>;
}

/// Watermark accessor for one task key
#[derive(Debug, Clone)]
pub struct Cursor {
    option_name: String,
    backend: Arc<dyn CursorBackend>,
}

impl Cursor {
    pub fn new(task_key: &str, backend: Arc<dyn CursorBackend>) -> Self {
        Self::with_prefix(task_key, CURSOR_KEY_PREFIX, backend)
    }

    pub fn with_prefix(task_key: &str, prefix: &str, backend: Arc<dyn CursorBackend>) -> Self {
        Self {
            option_name: format!("{prefix}{task_key}"),
            backend,
        }
    }

    /// A cursor that only lives as long as this process
    pub fn in_memory(task_key: &str) -> Self {
        Self::new(task_key, Arc::new(MemoryCursorBackend::new()))
    }

    /// Storage key this cursor reads and writes
    pub fn option_name(&self) -> &str {
        &self.option_name
    }

    /// Current watermark; 0 when unset or when the stored value is not a
    /// non-negative integer
    pub async fn get(&self) -> Result<i64> {
        let raw = self
            .backend
            .load(&self.option_name)
            .await
            .map_err(|source| self.error(source))?;

        Ok(match raw {
            None => 0,
            Some(value) => match coerce(&value) {
                Some(watermark) => watermark,
                None => {
                    warn!(
                        option_name = %self.option_name,
                        value = %value,
                        "Ignoring non-numeric cursor value"
                    );
                    0
                }
            },
        })
    }

    pub async fn set(&self, value: i64) -> Result<bool> {
        if value < 0 {
            return Err(BulkTaskError::InvalidInput(format!(
                "cursor value must be non-negative, got {value}"
            )));
        }

        debug!(option_name = %self.option_name, value, "Setting cursor");
        self.backend
            .save(&self.option_name, value)
            .await
            .map_err(|source| self.error(source))
    }

    pub async fn reset(&self) -> Result<bool> {
        debug!(option_name = %self.option_name, "Resetting cursor");
        self.backend
            .delete(&self.option_name)
            .await
            .map_err(|source| self.error(source))
    }

    fn error(&self, source: StoreError) -> BulkTaskError {
        BulkTaskError::Cursor {
            option_name: self.option_name.clone(),
            source,
        }
    }
}

/// Numeric strings (including "12.0") become integers; anything else is rejected
fn coerce(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(n) = value.parse::<i64>() {
        return (n >= 0).then_some(n);
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0 && *n <= i64::MAX as f64)
        .map(|n| n as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unset_cursor_defaults_to_zero() {
        let cursor = Cursor::in_memory("test_cursor");
        assert_eq!(cursor.get().await.unwrap(), 0);
        assert_eq!(cursor.option_name(), "bt_test_cursor");
    }

    #[tokio::test]
    async fn test_set_get_reset() {
        let cursor = Cursor::in_memory("test_cursor");
        assert!(cursor.set(1234).await.unwrap());
        assert_eq!(cursor.get().await.unwrap(), 1234);

        assert!(cursor.reset().await.unwrap());
        assert_eq!(cursor.get().await.unwrap(), 0);
        assert!(!cursor.reset().await.unwrap());
    }

    #[tokio::test]
    async fn test_non_numeric_values_coerce_to_zero() {
        let backend = Arc::new(MemoryCursorBackend::new());
        backend.put_raw("bt_garbage", "not-a-number");
        backend.put_raw("bt_float", "42.0");
        backend.put_raw("bt_negative", "-5");

        let backend: Arc<dyn CursorBackend> = backend;
        assert_eq!(Cursor::new("garbage", backend.clone()).get().await.unwrap(), 0);
        assert_eq!(Cursor::new("float", backend.clone()).get().await.unwrap(), 42);
        assert_eq!(Cursor::new("negative", backend).get().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_negative_values_rejected() {
        let cursor = Cursor::in_memory("test_cursor");
        assert!(cursor.set(-1).await.is_err());
    }

    #[tokio::test]
    async fn test_cursors_share_a_backend_by_key() {
        let backend: Arc<dyn CursorBackend> = Arc::new(MemoryCursorBackend::new());
        let first = Cursor::new("shared", backend.clone());
        let second = Cursor::new("shared", backend.clone());
        let other = Cursor::new("other", backend);

        first.set(99).await.unwrap();
        assert_eq!(second.get().await.unwrap(), 99);
        assert_eq!(other.get().await.unwrap(), 0);
    }
}
