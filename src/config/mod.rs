//! # Bulk Task Configuration
//!
//! Typed configuration for the engine, the progress reporter and the PostgreSQL
//! collaborators. Values are layered by [`ConfigLoader`]:
//!
//! 1. Built-in defaults ([`BulkTaskConfig::default`])
//! 2. `config/bulk_task.toml`
//! 3. `config/bulk_task.<environment>.toml`
//! 4. `BULK_TASK__<SECTION>__<FIELD>` environment variables
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tasker_bulk::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load()?;
//! let stepping = config.engine.stepping;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};

use crate::constants::{CURSOR_KEY_PREFIX, DEFAULT_PAGE_SIZE, DEFAULT_STEPPING};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigLoader;

/// Root configuration structure mirroring `config/bulk_task.toml`
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BulkTaskConfig {
    /// Windowing and cursor settings
    pub engine: EngineConfig,

    /// How progress is reported while a task runs
    pub progress: ProgressConfig,

    /// Connection settings for the PostgreSQL store and cursor backend
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Configured stepping; the driver uses the larger of this and the page size
    pub stepping: i64,
    /// Page size handed to sources when the caller does not supply one
    pub default_page_size: i64,
    /// Prefix joined to the task key to build the cursor option name
    pub cursor_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stepping: DEFAULT_STEPPING,
            default_page_size: DEFAULT_PAGE_SIZE,
            cursor_prefix: CURSOR_KEY_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressMode {
    /// Headless
    #[default]
    None,
    /// Periodic structured log lines
    Log,
    /// Interactive terminal bar
    Bar,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ProgressConfig {
    pub mode: ProgressMode,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL; `${DATABASE_URL}` defers to the environment variable
    pub url: Option<String>,
    pub max_connections: u32,
    /// Prefix for the record tables and the options table
    pub table_prefix: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
            table_prefix: "tasker_bulk_".to_string(),
        }
    }
}

impl DatabaseConfig {
    /// Resolve the connection URL, expanding `${DATABASE_URL}`
    pub fn database_url(&self) -> Option<String> {
        match self.url.as_deref() {
            None | Some("") | Some("${DATABASE_URL}") => std::env::var("DATABASE_URL").ok(),
            Some(url) => Some(url.to_string()),
        }
    }
}

impl BulkTaskConfig {
    /// Reject values the engine cannot make progress with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.engine.stepping <= 0 {
            return Err(ConfigurationError::invalid_value(
                "engine.stepping",
                self.engine.stepping.to_string(),
                "stepping must be greater than zero",
            ));
        }

        if self.engine.default_page_size <= 0 {
            return Err(ConfigurationError::invalid_value(
                "engine.default_page_size",
                self.engine.default_page_size.to_string(),
                "page size must be greater than zero",
            ));
        }

        if self.engine.cursor_prefix.is_empty() {
            return Err(ConfigurationError::invalid_value(
                "engine.cursor_prefix",
                String::new(),
                "cursor prefix must not be empty",
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                "0".to_string(),
                "at least one connection is required",
            ));
        }

        Ok(())
    }
}
