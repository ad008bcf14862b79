use resilience::BackoffConfigError;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by [`crate::CredentialRefreshManager`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RefreshError {
    /// Renewal kept failing until the backoff budget ran out. The manager has
    /// stopped and its last credential must be treated as untrustworthy.
    #[error(
        "Backoff exhausted for credential source {source_name}: {attempts} consecutive failed renewals over {elapsed:?}"
    )]
    BackoffExhausted {
        source_name: String,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("Failed to launch background renewal task: {0}")]
    Spawn(String),

    #[error("Invalid refresh configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl RefreshError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::BackoffExhausted { .. })
    }
}

/// Configuration loading and validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("Invalid backoff configuration: {0}")]
    Backoff(#[from] BackoffConfigError),
}
