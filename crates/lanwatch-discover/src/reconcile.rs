//! Reconciliation of a scan snapshot against the device registry.
//!
//! A hardware id the registry has never seen becomes a new device and
//! yields a `new_device` event. A known one gets its address, name and
//! last-seen time refreshed; role and status are left as the operator set
//! them. Events are returned to the caller, never published from here, so
//! every write for the snapshot is done before anyone hears about it.

use std::sync::Arc;

use chrono::Utc;
use lanwatch_core::{DeviceRecord, Event, ProbeResult, ReconcileCounts, ScanSnapshot};
use lanwatch_registry::{DeviceRegistry, RegistryError};

use crate::error::{DiscoverError, Result};

/// Outcome of one reconciliation.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub counts: ReconcileCounts,
    /// Events to publish, in snapshot order.
    pub events: Vec<Event>,
}

/// Whether an entry created or refreshed a record.
enum Applied {
    Created(DeviceRecord),
    Refreshed,
}

pub struct Reconciler {
    registry: Arc<dyn DeviceRegistry>,
}

impl Reconciler {
    pub fn new(registry: Arc<dyn DeviceRegistry>) -> Self {
        Self { registry }
    }

    /// Write every identified host of `snapshot` to the registry.
    ///
    /// Entries whose lookup or write fails are counted in `failed_count` and
    /// produce no event. If every attempted entry fails the registry is
    /// considered unavailable and the whole call errors.
    pub async fn reconcile(&self, snapshot: &ScanSnapshot) -> Result<Reconciliation> {
        let mut counts = ReconcileCounts {
            total_discovered: snapshot.len(),
            ..Default::default()
        };
        let mut events = Vec::new();
        let mut last_error: Option<RegistryError> = None;

        for result in snapshot.results() {
            if result.hardware_id.is_unknown() {
                tracing::debug!(address = %result.address, "No hardware id resolved, skipping");
                counts.unidentified_count += 1;
                continue;
            }

            match self.apply(result).await {
                Ok(Applied::Created(record)) => {
                    counts.new_count += 1;
                    events.push(Event::new_device(&record));
                }
                Ok(Applied::Refreshed) => counts.updated_count += 1,
                Err(e) => {
                    tracing::warn!(
                        address = %result.address,
                        hardware_id = %result.hardware_id,
                        error = %e,
                        "Registry write failed"
                    );
                    counts.failed_count += 1;
                    last_error = Some(e);
                }
            }
        }

        let attempted = counts.new_count + counts.updated_count + counts.failed_count;
        if attempted > 0 && counts.failed_count == attempted {
            return Err(DiscoverError::RegistryUnavailable {
                failed: counts.failed_count,
                last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
            });
        }

        tracing::info!(
            target = %snapshot.target,
            total = counts.total_discovered,
            new = counts.new_count,
            updated = counts.updated_count,
            failed = counts.failed_count,
            unidentified = counts.unidentified_count,
            "Reconciliation complete"
        );

        Ok(Reconciliation { counts, events })
    }

    async fn apply(&self, result: &ProbeResult) -> std::result::Result<Applied, RegistryError> {
        let now = Utc::now();
        match self.registry.lookup_by_hardware_id(&result.hardware_id).await? {
            None => {
                let record = DeviceRecord::discovered(result, now);
                self.registry.upsert(&record).await?;
                Ok(Applied::Created(record))
            }
            Some(existing) => {
                self.registry.upsert(&existing.refreshed(result, now)).await?;
                Ok(Applied::Refreshed)
            }
        }
    }
}
