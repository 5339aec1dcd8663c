//! Error types for the lanwatch-discover crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoverError {
    #[error("Invalid address range {input:?}: {reason}")]
    InvalidRange { input: String, reason: String },

    #[error("Probe tool not found at path: {path}")]
    ToolNotFound { path: String },

    #[error("Registry unavailable: all {failed} device writes failed (last error: {last_error})")]
    RegistryUnavailable { failed: usize, last_error: String },
}

impl DiscoverError {
    pub(crate) fn invalid_range(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DiscoverError>;
