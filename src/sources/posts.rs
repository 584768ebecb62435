use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{fetch_scoped, BatchResult, BatchSource};
use crate::constants::{args, source_types, DEFAULT_PAGE_SIZE};
use crate::error::{BulkTaskError, Result};
use crate::query::{IdRange, QueryArgs, RecordQuery};
use crate::record::RecordShape;
use crate::store::RecordStore;

/// Content records ordered by `id`
#[derive(Debug, Clone)]
pub struct PostSource {
    store: Arc<dyn RecordStore>,
    default_page_size: i64,
}

impl PostSource {
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
impl BatchSource for PostSource {
    fn source_type(&self) -> &'static str {
        source_types::POST
    }

    fn prepare_args(&self, query_args: QueryArgs) -> QueryArgs {
        query_args
            .with_defaults(&[
                (args::POST_TYPE, json!(args::ANY)),
                (args::POST_STATUS, json!(args::ANY)),
                (args::POSTS_PER_PAGE, json!(self.default_page_size)),
            ])
            .force(&[
                (args::ORDER, json!(args::ASC)),
                (args::ORDERBY, json!("id")),
                (args::PAGED, json!(1)),
                (args::NO_FOUND_ROWS, Value::Bool(true)),
            ])
    }

    fn page_size(&self, query_args: &QueryArgs) -> i64 {
        query_args
            .get_i64(args::POSTS_PER_PAGE)
            .unwrap_or(self.default_page_size)
    }

    fn live_predicates(&self) -> usize {
        self.store.scope().live_count()
    }

    async fn max_bound(&self, _query_args: &QueryArgs) -> Result<i64> {
        self.store
            .max_key(RecordShape::Post)
            .await
            .map_err(|e| BulkTaskError::store_unavailable(self.source_type(), e))
    }

    async fn fetch_window(
        &self,
        min_id: i64,
        stepping: i64,
        query_args: &QueryArgs,
    ) -> Result<BatchResult> {
        let query = RecordQuery::new(RecordShape::Post, query_args.clone())
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
