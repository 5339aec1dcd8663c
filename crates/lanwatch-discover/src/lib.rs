//! lanwatch-discover: Subnet discovery for the lanwatch dashboard.
//!
//! Probes every host of an IPv4 range with the platform's ping, resolves
//! names and hardware ids, and reconciles the live hosts against the
//! device registry.

pub mod config;
pub mod error;
pub mod neighbor;
pub mod probe;
pub mod range;
pub mod reconcile;
pub mod scanner;

pub use config::DiscoverConfig;
pub use error::{DiscoverError, Result};
pub use probe::{HostProbe, Platform, SystemProbe};
pub use range::AddressRange;
pub use reconcile::{Reconciler, Reconciliation};
pub use scanner::NetworkScanner;
