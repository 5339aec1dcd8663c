//! lanwatch-registry: the device registry seam.
//!
//! Discovery never owns device rows. It looks a device up by hardware id and
//! requests upserts through [`DeviceRegistry`]; creation, deletion and the
//! operator-managed fields belong to whatever sits behind the trait.

pub mod config;
pub mod error;
pub mod graph;
pub mod memory;
pub mod registry;

pub use config::{connect, RegistryBackend, RegistryConfig};
pub use error::RegistryError;
pub use graph::GraphRegistry;
pub use memory::MemoryRegistry;
pub use registry::DeviceRegistry;
