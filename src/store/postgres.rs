//! PostgreSQL record store.
//!
//! Expected tables (names carry the configured prefix, `tasker_bulk_` by default):
//!
//! ```sql
//! CREATE TABLE tasker_bulk_posts (
//!     id BIGSERIAL PRIMARY KEY,
//!     post_type TEXT NOT NULL,
//!     post_status TEXT NOT NULL,
//!     post_title TEXT NOT NULL,
//!     post_modified TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! CREATE TABLE tasker_bulk_terms (
//!     term_id BIGSERIAL PRIMARY KEY,
//!     name TEXT NOT NULL,
//!     slug TEXT NOT NULL
//! );
//! CREATE TABLE tasker_bulk_term_taxonomy (
//!     term_taxonomy_id BIGSERIAL PRIMARY KEY,
//!     term_id BIGINT NOT NULL REFERENCES tasker_bulk_terms (term_id),
//!     taxonomy TEXT NOT NULL,
//!     count BIGINT NOT NULL DEFAULT 0
//! );
//! CREATE TABLE tasker_bulk_users (
//!     id BIGSERIAL PRIMARY KEY,
//!     user_login TEXT NOT NULL,
//!     user_email TEXT NOT NULL,
//!     roles TEXT[] NOT NULL DEFAULT '{}'
//! );
//! ```

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{debug, instrument};

use super::RecordStore;
use crate::constants::args;
use crate::error::StoreError;
use crate::query::{IdRange, PredicateScope, RecordQuery};
use crate::record::{PostRecord, Record, RecordShape, TermRecord, UserRecord};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    table_prefix: String,
    scope: std::sync::Arc<PredicateScope>,
}

impl PgStore {
    pub fn new(pool: PgPool, table_prefix: impl Into<String>) -> Self {
        Self {
            pool,
            table_prefix: table_prefix.into(),
            scope: Default::default(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn table(&self, name: &str) -> String {
        format!("{}{}", self.table_prefix, name)
    }

    fn key_expression(shape: RecordShape) -> &'static str {
        match shape {
            RecordShape::Post => "p.id",
            RecordShape::Term => "tt.term_taxonomy_id",
            RecordShape::User => "u.id",
        }
    }

    /// Build the SELECT for `query`, injecting `range` when one is live for it
    pub(crate) fn build_select(
        &self,
        query: &RecordQuery,
        range: Option<IdRange>,
    ) -> QueryBuilder<'static, Postgres> {
        let query_args = query.args();
        let mut builder = match query.shape() {
            RecordShape::Post => {
                let mut builder = QueryBuilder::new(format!(
                    "SELECT p.id, p.post_type, p.post_status, p.post_title, p.post_modified \
                     FROM {} p WHERE 1 = 1",
                    self.table("posts")
                ));
                if let Some(types) = query_args.get_str_list(args::POST_TYPE) {
                    builder.push(" AND p.post_type = ANY(").push_bind(types).push(")");
                }
                if let Some(statuses) = query_args.get_str_list(args::POST_STATUS) {
                    builder
                        .push(" AND p.post_status = ANY(")
                        .push_bind(statuses)
                        .push(")");
                }
                builder
            }
            RecordShape::Term => {
                let mut builder = QueryBuilder::new(format!(
                    "SELECT tt.term_taxonomy_id, tt.term_id, tt.taxonomy, t.name, t.slug, tt.count \
                     FROM {} tt INNER JOIN {} t ON t.term_id = tt.term_id WHERE 1 = 1",
                    self.table("term_taxonomy"),
                    self.table("terms")
                ));
                if let Some(taxonomies) = query_args.get_str_list(args::TAXONOMY) {
                    builder
                        .push(" AND tt.taxonomy = ANY(")
                        .push_bind(taxonomies)
                        .push(")");
                }
                if query_args.get_bool(args::HIDE_EMPTY).unwrap_or(false) {
                    builder.push(" AND tt.count > 0");
                }
                builder
            }
            RecordShape::User => {
                let mut builder = QueryBuilder::new(format!(
                    "SELECT u.id, u.user_login, u.user_email, u.roles FROM {} u WHERE 1 = 1",
                    self.table("users")
                ));
                if let Some(roles) = query_args.get_str_list(args::ROLE) {
                    builder.push(" AND u.roles && ").push_bind(roles);
                }
                builder
            }
        };

        let key = Self::key_expression(query.shape());
        if let Some(range) = range {
            builder
                .push(format!(" AND {key} > "))
                .push_bind(range.after)
                .push(format!(" AND {key} <= "))
                .push_bind(range.up_to);
        }
        builder.push(format!(" ORDER BY {key} ASC"));
        if let Some(limit) = query.limit() {
            builder.push(" LIMIT ").push_bind(limit);
        }
        builder
    }

    fn decode(shape: RecordShape, row: &PgRow) -> Result<Record, sqlx::Error> {
        Ok(match shape {
            RecordShape::Post => Record::Post(PostRecord {
                id: row.try_get("id")?,
                post_type: row.try_get("post_type")?,
                post_status: row.try_get("post_status")?,
                title: row.try_get("post_title")?,
                modified_at: row.try_get("post_modified")?,
            }),
            RecordShape::Term => Record::Term(TermRecord {
                term_taxonomy_id: row.try_get("term_taxonomy_id")?,
                term_id: row.try_get("term_id")?,
                taxonomy: row.try_get("taxonomy")?,
                name: row.try_get("name")?,
                slug: row.try_get("slug")?,
                count: row.try_get("count")?,
            }),
            RecordShape::User => Record::User(UserRecord {
                id: row.try_get("id")?,
                login: row.try_get("user_login")?,
                email: row.try_get("user_email")?,
                roles: row.try_get("roles")?,
            }),
        })
    }

    fn max_key_sql(&self, shape: RecordShape) -> String {
        let table = match shape {
            RecordShape::Post => self.table("posts"),
            RecordShape::Term => self.table("term_taxonomy"),
            RecordShape::User => self.table("users"),
        };
        format!(
            "SELECT COALESCE(MAX({}), 0) AS max_key FROM {table}",
            shape.key_column()
        )
    }
}

#[async_trait]
impl RecordStore for PgStore {
    fn scope(&self) -> &PredicateScope {
        &self.scope
    }

    #[instrument(skip(self))]
    async fn max_key(&self, shape: RecordShape) -> Result<i64, StoreError> {
        let row = sqlx::query(&self.max_key_sql(shape))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("max_key")?)
    }

    #[instrument(skip(self, query), fields(shape = %query.shape(), token = %query.token()))]
    async fn execute(&self, query: &RecordQuery) -> Result<Vec<Record>, StoreError> {
        let range = self.scope.predicate_for(query.token());
        let mut builder = self.build_select(query, range);

        debug!(sql = builder.sql(), windowed = range.is_some(), "Executing record query");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| Self::decode(query.shape(), row).map_err(StoreError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryArgs;
    use serde_json::json;
    use sqlx::postgres::PgPoolOptions;

    fn store() -> PgStore {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgresql://localhost/tasker_bulk_test")
            .unwrap();
        PgStore::new(pool, "tasker_bulk_")
    }

    #[tokio::test]
    async fn test_windowed_post_select() {
        let store = store();
        let query = RecordQuery::new(
            RecordShape::Post,
            QueryArgs::new()
                .with("post_type", json!(["post", "page"]))
                .with("post_status", "any"),
        )
        .with_limit(100);

        let builder = store.build_select(&query, Some(IdRange::new(0, 10_000)));
        assert_eq!(
            builder.sql(),
            "SELECT p.id, p.post_type, p.post_status, p.post_title, p.post_modified \
             FROM tasker_bulk_posts p WHERE 1 = 1 AND p.post_type = ANY($1) \
             AND p.id > $2 AND p.id <= $3 ORDER BY p.id ASC LIMIT $4"
        );
    }

    #[tokio::test]
    async fn test_unscoped_term_select_has_no_range() {
        let store = store();
        let query = RecordQuery::new(
            RecordShape::Term,
            QueryArgs::new()
                .with("taxonomy", "category")
                .with("hide_empty", true),
        );

        let builder = store.build_select(&query, None);
        let sql = builder.sql();
        assert!(sql.contains("tt.taxonomy = ANY($1)"));
        assert!(sql.contains("tt.count > 0"));
        assert!(!sql.contains("term_taxonomy_id >"));
        assert!(!sql.contains("LIMIT"));
        assert!(sql.ends_with("ORDER BY tt.term_taxonomy_id ASC"));
    }

    #[tokio::test]
    async fn test_max_key_sql() {
        let store = store();
        assert_eq!(
            store.max_key_sql(RecordShape::Term),
            "SELECT COALESCE(MAX(term_taxonomy_id), 0) AS max_key FROM tasker_bulk_term_taxonomy"
        );
    }
}
