//! The scan service: scan, reconcile, then publish.
//!
//! One scan runs at a time. A trigger that arrives while a scan is running is
//! rejected rather than queued, so overlapping scans of the same range never
//! happen.

use std::sync::Arc;

use lanwatch_core::{Event, ReconcileCounts};
use lanwatch_discover::{AddressRange, DiscoverConfig, HostProbe, NetworkScanner, Reconciler};
use lanwatch_registry::DeviceRegistry;
use lanwatch_sync::BroadcastHub;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::ServerError;

/// What a completed scan reports to its trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Reachable hosts found.
    pub discovered: usize,
    pub new_devices: usize,
    pub updated_devices: usize,
    pub failed_devices: usize,
}

impl From<&ReconcileCounts> for ScanReport {
    fn from(counts: &ReconcileCounts) -> Self {
        Self {
            discovered: counts.total_discovered,
            new_devices: counts.new_count,
            updated_devices: counts.updated_count,
            failed_devices: counts.failed_count,
        }
    }
}

pub struct ScanService {
    scanner: NetworkScanner,
    reconciler: Reconciler,
    hub: BroadcastHub,
    default_range: Option<String>,
    scan_lock: Mutex<()>,
}

impl ScanService {
    pub fn new(
        probe: Arc<dyn HostProbe>,
        registry: Arc<dyn DeviceRegistry>,
        hub: BroadcastHub,
        config: &DiscoverConfig,
    ) -> Self {
        Self {
            scanner: NetworkScanner::new(probe, config),
            reconciler: Reconciler::new(registry),
            hub,
            default_range: config.default_range.clone(),
            scan_lock: Mutex::new(()),
        }
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// Scan `target` (or the default range), write the results to the
    /// registry and publish the resulting events.
    ///
    /// Events are published only after every registry write for the scan has
    /// been attempted; `scan_complete` always comes last.
    pub async fn run(&self, target: Option<&str>) -> Result<ScanReport, ServerError> {
        let _guard = self
            .scan_lock
            .try_lock()
            .map_err(|_| ServerError::ScanInProgress)?;

        let range = self.resolve_range(target)?;
        let snapshot = self.scanner.scan(&range).await;
        let outcome = self.reconciler.reconcile(&snapshot).await?;

        for event in outcome.events {
            self.hub.publish(event);
        }
        self.hub.publish(Event::scan_complete(&outcome.counts));

        Ok(ScanReport::from(&outcome.counts))
    }

    fn resolve_range(&self, target: Option<&str>) -> Result<AddressRange, ServerError> {
        match target.or(self.default_range.as_deref()) {
            Some(raw) => Ok(self.scanner.parse_range(raw)?),
            None => Ok(AddressRange::local()),
        }
    }
}
