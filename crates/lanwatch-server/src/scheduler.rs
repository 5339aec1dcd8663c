//! Periodic scans of the default range.
//!
//! Scheduled scans go through the same [`ScanService`] as HTTP triggers and
//! share its scan lock; a tick that lands while another scan is running is
//! skipped.

use std::sync::Arc;

use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::error::ServerError;
use crate::service::ScanService;

/// Run a scan every `period` until the runtime shuts down.
pub async fn run_scheduled_scans(service: Arc<ScanService>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(interval_secs = period.as_secs(), "Scan scheduler started");

    loop {
        ticker.tick().await;
        tracing::info!("Scheduled scan triggered");

        match service.run(None).await {
            Ok(report) => tracing::info!(
                discovered = report.discovered,
                new = report.new_devices,
                updated = report.updated_devices,
                failed = report.failed_devices,
                "Scheduled scan complete"
            ),
            Err(ServerError::ScanInProgress) => {
                tracing::info!("Scan already running, skipping scheduled scan")
            }
            Err(e) => tracing::error!(error = %e, "Scheduled scan failed"),
        }
    }
}
