//! Error types for the lanwatch-sync crate.

use thiserror::Error;

/// A sink could not accept a message. Consumed by the hub, never surfaced to publishers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Subscriber channel closed")]
    Closed,
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket handshake failed: {0}")]
    Handshake(String),
}
