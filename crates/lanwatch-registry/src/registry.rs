//! The registry interface consumed by reconciliation.

use async_trait::async_trait;
use lanwatch_core::{DeviceRecord, HardwareId};

use crate::error::RegistryError;

/// Lookup and upsert of device records keyed by hardware id.
///
/// Implementations must be safe to share across tasks.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Fetch the current record for a hardware id, if any.
    async fn lookup_by_hardware_id(
        &self,
        hardware_id: &HardwareId,
    ) -> Result<Option<DeviceRecord>, RegistryError>;

    /// Insert or replace the record with `record.hardware_id`.
    async fn upsert(&self, record: &DeviceRecord) -> Result<(), RegistryError>;
}
