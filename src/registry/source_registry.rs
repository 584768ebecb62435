//! # Source Registry
//!
//! Static, name-keyed lookup of [`BatchSource`] adapters. Names match exactly;
//! there is no prefix or case folding, and an unknown name fails before any
//! store or cursor is touched.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use tasker_bulk::registry::SourceRegistry;
//! use tasker_bulk::store::MemoryStore;
//!
//! let registry = SourceRegistry::with_store(Arc::new(MemoryStore::new()));
//! assert!(registry.resolve("post").is_ok());
//! assert!(registry.resolve("widget").is_err());
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::EngineConfig;
use crate::constants::DEFAULT_PAGE_SIZE;
use crate::error::{BulkTaskError, Result};
use crate::sources::{BatchSource, CsvSource, PostSource, TermSource, UserSource};
use crate::store::RecordStore;

#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: BTreeMap<String, Arc<dyn BatchSource>>,
}

impl SourceRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The four built-in sources, with `store` behind the store-backed ones
    pub fn with_store(store: Arc<dyn RecordStore>) -> Self {
        Self::with_page_size(store, DEFAULT_PAGE_SIZE)
    }

    /// Built-in sources using the configured default page size
    pub fn from_config(store: Arc<dyn RecordStore>, engine: &EngineConfig) -> Self {
        Self::with_page_size(store, engine.default_page_size)
    }

    fn with_page_size(store: Arc<dyn RecordStore>, page_size: i64) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(
            PostSource::new(store.clone()).with_default_page_size(page_size),
        ));
        registry.register(Arc::new(TermSource::new(store.clone())));
        registry.register(Arc::new(
            UserSource::new(store).with_default_page_size(page_size),
        ));
        registry.register(Arc::new(
            CsvSource::new().with_default_page_size(page_size),
        ));
        registry
    }

    /// Add or replace the source registered under its own name
    pub fn register(&mut self, source: Arc<dyn BatchSource>) -> Option<Arc<dyn BatchSource>> {
        let name = source.source_type().to_string();
        debug!(source_type = %name, "Registering batch source");
        self.sources.insert(name, source)
    }

    pub fn resolve(&self, source_type: &str) -> Result<Arc<dyn BatchSource>> {
        self.sources
            .get(source_type)
            .cloned()
            .ok_or_else(|| BulkTaskError::UnknownSourceType(source_type.to_string()))
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.sources.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_builtin_sources() {
        let registry = SourceRegistry::with_store(Arc::new(MemoryStore::new()));
        assert_eq!(registry.names(), vec!["csv", "post", "term", "user"]);
        assert_eq!(registry.resolve("term").unwrap().source_type(), "term");
    }

    #[test]
    fn test_exact_match_only() {
        let registry = SourceRegistry::with_store(Arc::new(MemoryStore::new()));
        for name in ["widget", "Post", "posts", " post", ""] {
            assert!(matches!(
                registry.resolve(name),
                Err(BulkTaskError::UnknownSourceType(ref n)) if n == name
            ));
        }
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = SourceRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.register(Arc::new(CsvSource::new())).is_none());
        assert!(registry.register(Arc::new(CsvSource::new())).is_some());
        assert_eq!(registry.len(), 1);
    }
}
