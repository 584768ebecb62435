//! # Database Operations
//!
//! PostgreSQL connection pooling and schema setup for
//! [`PgStore`](crate::store::PgStore) and
//! [`PgCursorBackend`](crate::cursor::PgCursorBackend).
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tasker_bulk::config::DatabaseConfig;
//! use tasker_bulk::database::{ensure_schema, DatabaseConnection};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DatabaseConfig::default();
//! let db = DatabaseConnection::connect(&config).await?;
//! ensure_schema(db.pool(), &config.table_prefix).await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod schema;

pub use connection::DatabaseConnection;
pub use schema::ensure_schema;
