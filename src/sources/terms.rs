use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{fetch_scoped, BatchResult, BatchSource};
use crate::constants::{args, source_types};
use crate::error::{BulkTaskError, Result};
use crate::query::{IdRange, QueryArgs, RecordQuery};
use crate::record::RecordShape;
use crate::store::RecordStore;

/// Taxonomy relationships ordered by `term_taxonomy_id`.
///
/// Defaults to every taxonomy, skips empty terms, and fetches the whole
/// window (`number = 0`) unless the caller asks for a page size.
#[derive(Debug, Clone)]
pub struct TermSource {
    store: Arc<dyn RecordStore>,
}

impl TermSource {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BatchSource for TermSource {
    fn source_type(&self) -> &'static str {
        source_types::TERM
    }

    fn prepare_args(&self, query_args: QueryArgs) -> QueryArgs {
        query_args
            .with_defaults(&[
                (args::NUMBER, json!(0)),
                (args::HIDE_EMPTY, Value::Bool(true)),
            ])
            .force(&[
                (args::ORDER, json!(args::ASC)),
                (args::ORDERBY, json!("term_taxonomy_id")),
                (args::UPDATE_META_CACHE, Value::Bool(false)),
            ])
    }

    fn page_size(&self, query_args: &QueryArgs) -> i64 {
        query_args.get_i64(args::NUMBER).unwrap_or(0)
    }

    fn live_predicates(&self) -> usize {
        self.store.scope().live_count()
    }

    async fn max_bound(&self, _query_args: &QueryArgs) -> Result<i64> {
        self.store
            .max_key(RecordShape::Term)
            .await
            .map_err(|e| BulkTaskError::store_unavailable(self.source_type(), e))
    }

    async fn fetch_window(
        &self,
        min_id: i64,
        stepping: i64,
        query_args: &QueryArgs,
    ) -> Result<BatchResult> {
        let query = RecordQuery::new(RecordShape::Term, query_args.clone())
            .with_limit(self.page_size(query_args));
        fetch_scoped(
            self.store.as_ref(),
            self.source_type(),
            query,
            IdRange::new(min_id, stepping),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_defaults() {
        let source = TermSource::new(Arc::new(MemoryStore::new()));
        let prepared = source.prepare_args(QueryArgs::new().with(args::ORDERBY, "name"));

        assert_eq!(prepared.get_str(args::ORDERBY), Some("term_taxonomy_id"));
        assert_eq!(prepared.get_bool(args::HIDE_EMPTY), Some(true));
        assert_eq!(prepared.get_bool(args::UPDATE_META_CACHE), Some(false));
        assert_eq!(prepared.get_str_list(args::TAXONOMY), None);
        assert_eq!(source.page_size(&prepared), 0);
    }
}
