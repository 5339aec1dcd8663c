//! lanwatch-server: the dashboard backend.
//!
//! Wires discovery, the device registry and the broadcast hub together
//! behind an HTTP API, a WebSocket endpoint and an optional scan schedule.

pub mod config;
pub mod error;
pub mod routes;
pub mod scheduler;
pub mod service;

pub use config::{ServerConfig, Settings};
pub use error::ServerError;
pub use service::{ScanReport, ScanService};
