//! Configuration error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Figment could not merge or extract the layered sources.
    #[error("Configuration error: {0}")]
    Figment(#[from] figment::Error),

    /// A field holds a value the job runner cannot use.
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
