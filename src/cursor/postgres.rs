//! Option-table cursor storage in PostgreSQL.
//!
//! Cursor rows are written with `autoload = false` so a host that preloads
//! every autoloaded option at boot never pulls bulk task cursors into memory.
//!
//! ```sql
//! CREATE TABLE tasker_bulk_options (
//!     option_name TEXT PRIMARY KEY,
//!     option_value TEXT NOT NULL,
//!     autoload BOOLEAN NOT NULL DEFAULT TRUE,
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! ```

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use super::CursorBackend;
use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct PgCursorBackend {
    pool: PgPool,
    table: String,
}

impl PgCursorBackend {
    pub fn new(pool: PgPool, table_prefix: &str) -> Self {
        Self {
            pool,
            table: format!("{table_prefix}options"),
        }
    }

    fn load_sql(&self) -> String {
        format!(
            "SELECT option_value FROM {} WHERE option_name = $1",
            self.table
        )
    }

    fn save_sql(&self) -> String {
        format!(
            "INSERT INTO {} (option_name, option_value, autoload, updated_at) \
             VALUES ($1, $2, FALSE, now()) \
             ON CONFLICT (option_name) DO UPDATE \
             SET option_value = EXCLUDED.option_value, autoload = FALSE, updated_at = now()",
            self.table
        )
    }

    fn delete_sql(&self) -> String {
        format!("DELETE FROM {} WHERE option_name = $1", self.table)
    }
}

#[async_trait]
impl CursorBackend for PgCursorBackend {
    #[instrument(skip(self))]
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query(&self.load_sql())
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) => Some(row.try_get("option_value")?),
            None => None,
        })
    }

    #[instrument(skip(self))]
    async fn save(&self, key: &str, value: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(&self.save_sql())
            .bind(key)
            .bind(value.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(&self.delete_sql())
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
