//! Registry backend selection.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::RegistryError;
use crate::graph::{GraphConfig, GraphRegistry};
use crate::memory::MemoryRegistry;
use crate::registry::DeviceRegistry;

/// `[registry]` configuration section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub backend: RegistryBackend,

    /// Connection settings, used when `backend = "neo4j"`.
    #[serde(default)]
    pub neo4j: GraphConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RegistryBackend {
    /// Process-local; contents are lost on restart.
    #[default]
    Memory,
    Neo4j,
}

/// Build the configured registry.
pub async fn connect(config: &RegistryConfig) -> Result<Arc<dyn DeviceRegistry>, RegistryError> {
    match config.backend {
        RegistryBackend::Memory => {
            tracing::warn!("Using in-memory device registry; devices are not persisted");
            Ok(Arc::new(MemoryRegistry::new()))
        }
        RegistryBackend::Neo4j => Ok(Arc::new(GraphRegistry::connect(&config.neo4j).await?)),
    }
}
