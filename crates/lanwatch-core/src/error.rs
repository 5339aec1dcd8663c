use thiserror::Error;

/// Top-level error type for shared lanwatch functionality.
#[derive(Error, Debug)]
pub enum LanwatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid hardware id: {0}")]
    InvalidHardwareId(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
