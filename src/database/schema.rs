//! Idempotent creation of the tables the PostgreSQL store and cursor backend
//! read and write. Every statement is `IF NOT EXISTS`, so this is safe to run
//! on every start.

use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::error::StoreError;

fn statements(prefix: &str) -> Vec<String> {
    vec![
        format!(
            "CREATE TABLE IF NOT EXISTS {prefix}options (
                option_name TEXT PRIMARY KEY,
                option_value TEXT NOT NULL,
                autoload BOOLEAN NOT NULL DEFAULT TRUE,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {prefix}posts (
                id BIGSERIAL PRIMARY KEY,
                post_type TEXT NOT NULL,
                post_status TEXT NOT NULL,
                post_title TEXT NOT NULL,
                post_modified TIMESTAMPTZ NOT NULL DEFAULT now()
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {prefix}terms (
                term_id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                slug TEXT NOT NULL
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {prefix}term_taxonomy (
                term_taxonomy_id BIGSERIAL PRIMARY KEY,
                term_id BIGINT NOT NULL REFERENCES {prefix}terms (term_id),
                taxonomy TEXT NOT NULL,
                count BIGINT NOT NULL DEFAULT 0
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {prefix}users (
                id BIGSERIAL PRIMARY KEY,
                user_login TEXT NOT NULL,
                user_email TEXT NOT NULL,
                roles TEXT[] NOT NULL DEFAULT '{{}}'
            )"
        ),
    ]
}

#[instrument(skip(pool))]
pub async fn ensure_schema(pool: &PgPool, table_prefix: &str) -> Result<(), StoreError> {
    for statement in statements(table_prefix) {
        debug!(statement = %statement, "Applying schema statement");
        sqlx::query(&statement).execute(pool).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_use_prefix() {
        let statements = statements("bulk_");
        assert_eq!(statements.len(), 5);
        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS bulk_options"));
        assert!(statements[3].contains("REFERENCES bulk_terms (term_id)"));
        assert!(statements[4].contains("DEFAULT '{}'"));
    }
}
