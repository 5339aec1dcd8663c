//! Neo4j-backed device registry.
//!
//! Devices are `(:Device {hardware_id})` nodes. Upserts use MERGE so repeated
//! sightings of the same hardware id land on the same node.

use std::net::Ipv4Addr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lanwatch_core::{DeviceId, DeviceRecord, HardwareId};
use neo4rs::{query, ConfigBuilder, Graph, Query, Row};
use serde::Deserialize;

use crate::error::RegistryError;
use crate::registry::DeviceRegistry;

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub fetch_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "lanwatch-dev".to_string(),
            max_connections: 16,
            fetch_size: 256,
        }
    }
}

/// Thread-safe Neo4j registry with connection pooling.
///
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct GraphRegistry {
    graph: Graph,
}

impl GraphRegistry {
    /// Connect to Neo4j and make sure the hardware id constraint exists.
    pub async fn connect(config: &GraphConfig) -> Result<Self, RegistryError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| RegistryError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| RegistryError::Connection(e.to_string()))?;

        let registry = Self { graph };
        registry
            .run(query(
                "CREATE CONSTRAINT device_hardware_id IF NOT EXISTS
                 FOR (d:Device) REQUIRE d.hardware_id IS UNIQUE",
            ))
            .await?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j device registry");
        Ok(registry)
    }

    /// Execute a write-only query.
    pub async fn run(&self, query: Query) -> Result<(), RegistryError> {
        self.graph.run(query).await?;
        Ok(())
    }

    /// Execute a read query and return the first row, if any.
    pub async fn query_one(&self, query: Query) -> Result<Option<Row>, RegistryError> {
        let mut stream = self.graph.execute(query).await?;
        Ok(stream.next().await?)
    }

    /// Remove a device node. Used by tests and operator tooling only.
    pub async fn delete(&self, hardware_id: &HardwareId) -> Result<(), RegistryError> {
        let q = query("MATCH (d:Device {hardware_id: $hardware_id}) DETACH DELETE d")
            .param("hardware_id", hardware_id.to_string());
        self.run(q).await
    }
}

#[async_trait]
impl DeviceRegistry for GraphRegistry {
    async fn lookup_by_hardware_id(
        &self,
        hardware_id: &HardwareId,
    ) -> Result<Option<DeviceRecord>, RegistryError> {
        let q = query(
            "MATCH (d:Device {hardware_id: $hardware_id})
             RETURN d.id AS id, d.hardware_id AS hardware_id, d.ip AS ip,
                    d.hostname AS hostname, d.role AS role, d.status AS status,
                    d.first_seen AS first_seen, d.last_seen AS last_seen
             LIMIT 1",
        )
        .param("hardware_id", hardware_id.to_string());

        match self.query_one(q).await? {
            Some(row) => Ok(Some(row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, record: &DeviceRecord) -> Result<(), RegistryError> {
        let q = query(
            "MERGE (d:Device {hardware_id: $hardware_id})
             ON CREATE SET
               d.id = $id, d.ip = $ip, d.hostname = $hostname,
               d.role = $role, d.status = $status,
               d.first_seen = $first_seen, d.last_seen = $last_seen
             ON MATCH SET
               d.ip = $ip, d.hostname = $hostname,
               d.role = $role, d.status = $status,
               d.last_seen = $last_seen",
        )
        .param("hardware_id", record.hardware_id.to_string())
        .param("id", record.id.to_string())
        .param("ip", record.address.to_string())
        .param("hostname", record.display_name.clone())
        .param("role", record.role.as_str().to_string())
        .param("status", record.status.as_str().to_string())
        .param("first_seen", record.first_seen.to_rfc3339())
        .param("last_seen", record.last_seen.to_rfc3339());

        self.run(q).await
    }
}

fn row_to_record(row: &Row) -> Result<DeviceRecord, RegistryError> {
    let hardware_id: HardwareId = get_string(row, "hardware_id")?
        .parse()
        .map_err(|e: lanwatch_core::LanwatchError| RegistryError::Serialization(e.to_string()))?;

    let id = match get_string(row, "id")?.parse() {
        Ok(uuid) => DeviceId(uuid),
        Err(_) => DeviceId::from_hardware_id(&hardware_id),
    };

    let address: Ipv4Addr = get_string(row, "ip")?
        .parse()
        .map_err(|e| RegistryError::Serialization(format!("Invalid ip: {e}")))?;

    Ok(DeviceRecord {
        id,
        hardware_id,
        address,
        display_name: get_string(row, "hostname")?,
        role: get_string(row, "role")?.parse().unwrap_or_default(),
        status: get_string(row, "status")?.parse().unwrap_or_default(),
        first_seen: parse_time(&get_string(row, "first_seen")?)?,
        last_seen: parse_time(&get_string(row, "last_seen")?)?,
    })
}

fn get_string(row: &Row, key: &str) -> Result<String, RegistryError> {
    row.get::<String>(key)
        .map_err(|e| RegistryError::Serialization(format!("Failed to read {key}: {e}")))
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, RegistryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| RegistryError::Serialization(format!("Invalid timestamp {raw}: {e}")))
}
