use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{fetch_scoped, BatchResult, BatchSource};
use crate::constants::{args, source_types, DEFAULT_PAGE_SIZE};
use crate::error::{BulkTaskError, Result};
use crate::query::{IdRange, QueryArgs, RecordQuery};
use crate::record::RecordShape;
use crate::store::RecordStore;

/// Accounts ordered by `id`
#[derive(Debug, Clone)]
pub struct UserSource {
    store: Arc<dyn RecordStore>,
    default_page_size: i64,
}

impl UserSource {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_default_page_size(mut self, page_size: i64) -> Self {
        self.default_page_size = page_size;
        self
    }
}

#[async_trait]
impl BatchSource for UserSource {
    fn source_type(&self) -> &'static str {
        source_types::USER
    }

    fn prepare_args(&self, query_args: QueryArgs) -> QueryArgs {
        query_args
            .with_defaults(&[(args::NUMBER, json!(self.default_page_size))])
            .force(&[
                (args::ORDER, json!(args::ASC)),
                (args::ORDERBY, json!("id")),
                (args::COUNT_TOTAL, Value::Bool(false)),
            ])
    }

    fn page_size(&self, query_args: &QueryArgs) -> i64 {
        query_args
            .get_i64(args::NUMBER)
            .unwrap_or(self.default_page_size)
    }

    fn live_predicates(&self) -> usize {
        self.store.scope().live_count()
    }

    async fn max_bound(&self, _query_args: &QueryArgs) -> Result<i64> {
        self.store
            .max_key(RecordShape::User)
            .await
            .map_err(|e| BulkTaskError::store_unavailable(self.source_type(), e))
    }

    async fn fetch_window(
        &self,
        min_id: i64,
        stepping: i64,
        query_args: &QueryArgs,
    ) -> Result<BatchResult> {
        let query = RecordQuery::new(RecordShape::User, query_args.clone())
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
    fn test_forced_args() {
        let source = UserSource::new(Arc::new(MemoryStore::new()));
        let prepared = source.prepare_args(QueryArgs::new().with(args::COUNT_TOTAL, true));

        assert_eq!(prepared.get_bool(args::COUNT_TOTAL), Some(false));
        assert_eq!(prepared.get_str(args::ORDER), Some("ASC"));
        assert_eq!(source.page_size(&prepared), 100);
    }
}
