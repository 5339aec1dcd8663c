//! lanwatch-core: Shared types, events, configuration, and error handling for lanwatch.
//!
//! This crate provides the foundational types used across all lanwatch components:
//! - Probe and scan types (`ProbeResult`, `ScanSnapshot`)
//! - Device identity and registry records (`HardwareId`, `DeviceId`, `DeviceRecord`)
//! - The `Event` type disseminated to live dashboard observers
//! - Layered configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use error::LanwatchError;
pub use events::Event;
pub use types::{
    DeviceId, DeviceRecord, DeviceRole, DeviceStatus, HardwareId, ProbeResult, ReconcileCounts,
    ScanSnapshot,
};
