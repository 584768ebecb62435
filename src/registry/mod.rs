//! # Registry Infrastructure
//!
//! Lookup of the batch sources a [`BulkTask`](crate::driver::BulkTask) can
//! iterate, keyed by source-type name.
//!
//! ```text
//! Registry Infrastructure
//! └── SourceRegistry    (source-type name → BatchSource)
//! ```

pub mod source_registry;

pub use source_registry::SourceRegistry;
