//! Error types for registry operations.

/// Errors from registry lookups and writes.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("Registry unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
