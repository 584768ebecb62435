//! Configuration Loader
//!
//! Environment-aware configuration loading. Handles file discovery, environment
//! detection and layering of environment variable overrides.

use std::env;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use tracing::debug;

use super::error::ConfigResult;
use super::BulkTaskConfig;

const CONFIG_BASENAME: &str = "bulk_task";
const ENV_PREFIX: &str = "BULK_TASK";

/// Loads [`BulkTaskConfig`] from layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<BulkTaskConfig> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<BulkTaskConfig> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with an explicit environment.
    /// Useful for testing without modifying global environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<BulkTaskConfig> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            environment = %environment,
            config_directory = %config_directory.display(),
            "Loading bulk task configuration"
        );

        let config: BulkTaskConfig = Config::builder()
            .add_source(Config::try_from(&BulkTaskConfig::default())?)
            .add_source(Self::file_source(&config_directory, CONFIG_BASENAME))
            .add_source(Self::file_source(
                &config_directory,
                &format!("{CONFIG_BASENAME}.{environment}"),
            ))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;

        debug!(
            stepping = config.engine.stepping,
            default_page_size = config.engine.default_page_size,
            progress = ?config.progress.mode,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Detect the current environment from environment variables
    pub fn detect_environment() -> String {
        env::var("TASKER_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    fn file_source(directory: &Path, name: &str) -> impl config::Source + Send + Sync + 'static {
        let path = directory.join(format!("{name}.toml"));
        File::new(&path.to_string_lossy(), FileFormat::Toml).required(false)
    }
}
