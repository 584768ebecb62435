use thiserror::Error;

use crate::config::ConfigurationError;
use crate::constants::exit_codes;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by record stores and cursor backends
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unsupported query: {0}")]
    Unsupported(String),
}

/// Fatal outcomes of a bulk task run.
///
/// A callback asking the run to stop is not an error; it surfaces as
/// [`RunOutcome::Halted`](crate::driver::RunOutcome::Halted).
#[derive(Error, Debug)]
pub enum BulkTaskError {
    #[error("Unknown source type: {0}")]
    UnknownSourceType(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store unavailable for {source_type}: {source}")]
    StoreUnavailable {
        source_type: String,
        #[source]
        source: StoreError,
    },

    #[error("Callback failed on record {ordering_key}: {source}")]
    CallbackFailure {
        ordering_key: i64,
        #[source]
        source: BoxError,
    },

    #[error("Hook failed during {phase}: {source}")]
    HookFailure {
        phase: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("Cursor error for {option_name}: {source}")]
    Cursor {
        option_name: String,
        #[source]
        source: StoreError,
    },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BulkTaskError {
    pub fn store_unavailable(source_type: &str, source: StoreError) -> Self {
        Self::StoreUnavailable {
            source_type: source_type.to_string(),
            source,
        }
    }

    pub fn callback_failure(ordering_key: i64, source: anyhow::Error) -> Self {
        Self::CallbackFailure {
            ordering_key,
            source: source.into(),
        }
    }

    pub fn hook_failure(phase: &'static str, source: anyhow::Error) -> Self {
        Self::HookFailure {
            phase,
            source: source.into(),
        }
    }

    /// Process exit code for a CLI wrapping the engine
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnknownSourceType(_) | Self::InvalidInput(_) | Self::Configuration(_) => {
                exit_codes::USAGE
            }
            _ => exit_codes::FATAL,
        }
    }
}

pub type Result<T> = std::result::Result<T, BulkTaskError>;
