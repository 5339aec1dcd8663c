//! Process-local registry backed by a hash map.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use lanwatch_core::{DeviceRecord, HardwareId};
use parking_lot::RwLock;

use crate::error::RegistryError;
use crate::registry::DeviceRegistry;

/// In-memory registry. Clone is cheap (inner Arc); clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    devices: Arc<RwLock<HashMap<HardwareId, DeviceRecord>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }

    /// All records, ordered by last sighting (most recent first).
    pub fn list(&self) -> Vec<DeviceRecord> {
        let mut records: Vec<DeviceRecord> = self.devices.read().values().cloned().collect();
        records.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        records
    }

    pub fn get(&self, hardware_id: &HardwareId) -> Option<DeviceRecord> {
        self.devices.read().get(hardware_id).cloned()
    }
}

#[async_trait]
impl DeviceRegistry for MemoryRegistry {
    async fn lookup_by_hardware_id(
        &self,
        hardware_id: &HardwareId,
    ) -> Result<Option<DeviceRecord>, RegistryError> {
        Ok(self.get(hardware_id))
    }

    async fn upsert(&self, record: &DeviceRecord) -> Result<(), RegistryError> {
        self.devices
            .write()
            .insert(record.hardware_id.clone(), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lanwatch_core::{DeviceRole, ProbeResult};
    use std::net::Ipv4Addr;

    fn record(mac: &str, last_octet: u8) -> DeviceRecord {
        let result = ProbeResult::reachable(
            Ipv4Addr::new(10, 0, 0, last_octet),
            Some(format!("host-{last_octet}")),
            HardwareId::parse(mac),
        );
        DeviceRecord::discovered(&result, Utc::now())
    }

    #[tokio::test]
    async fn test_lookup_missing() {
        let registry = MemoryRegistry::new();
        let id = HardwareId::parse("aa:bb:cc:dd:ee:ff").unwrap();
        assert!(registry.lookup_by_hardware_id(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_then_lookup() {
        let registry = MemoryRegistry::new();
        let rec = record("aa:bb:cc:dd:ee:ff", 5);
        registry.upsert(&rec).await.unwrap();

        let found = registry
            .lookup_by_hardware_id(&rec.hardware_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, rec);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let registry = MemoryRegistry::new();
        let mut rec = record("aa:bb:cc:dd:ee:ff", 5);
        registry.upsert(&rec).await.unwrap();

        rec.role = DeviceRole::Volunteer;
        rec.address = Ipv4Addr::new(10, 0, 0, 6);
        registry.upsert(&rec).await.unwrap();

        assert_eq!(registry.len(), 1);
        let stored = registry.get(&rec.hardware_id).unwrap();
        assert_eq!(stored.role, DeviceRole::Volunteer);
        assert_eq!(stored.address, Ipv4Addr::new(10, 0, 0, 6));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let registry = MemoryRegistry::new();
        let other = registry.clone();
        registry.upsert(&record("aa:bb:cc:dd:ee:01", 1)).await.unwrap();
        other.upsert(&record("aa:bb:cc:dd:ee:02", 2)).await.unwrap();
        assert_eq!(registry.list().len(), 2);
    }
}
