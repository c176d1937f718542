//! Engine error types.

use coinrates_common::RateError;
use thiserror::Error;

pub use coinrates_common::{FetchError, FetchResult, RateResult};

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Settings file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Settings document is not valid JSON for the expected shape.
    #[error("Invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),

    /// Settings parsed but are inconsistent.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for RateError {
    fn from(error: ConfigError) -> Self {
        RateError::Configuration(error.to_string())
    }
}
