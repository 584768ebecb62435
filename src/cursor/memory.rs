use async_trait::async_trait;
use dashmap::DashMap;

use super::CursorBackend;
use crate::error::StoreError;

/// Process-local cursor storage; values vanish when the process exits
#[derive(Debug, Default)]
pub struct MemoryCursorBackend {
    values: DashMap<String, String>,
}

impl MemoryCursorBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an arbitrary raw value, bypassing integer typing
    pub fn put_raw(&self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl CursorBackend for MemoryCursorBackend {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).map(|entry| entry.value().clone()))
    }

    async fn save(&self, key: &str, value: i64) -> Result<bool, StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.values.remove(key).is_some())
    }
}
