//! Range scanning over a bounded pool of concurrent probes.
//!
//! Every host of the range is probed; results are collected in completion
//! order and filtered to reachable hosts. Individual probe failures never
//! fail the scan.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lanwatch_core::{ProbeResult, ScanSnapshot};
use tokio::task::JoinSet;
use tokio::time::timeout;

use crate::config::DiscoverConfig;
use crate::error::Result;
use crate::probe::HostProbe;
use crate::range::AddressRange;

/// Slack past `probe_timeout` before a probe is abandoned. Well-behaved probes
/// finish inside their own budget; this only catches ones that do not.
const ABANDON_GRACE: Duration = Duration::from_millis(250);

/// Scans address ranges with a shared [`HostProbe`].
pub struct NetworkScanner {
    probe: Arc<dyn HostProbe>,
    concurrency: usize,
    max_hosts: usize,
    probe_timeout: Duration,
}

impl NetworkScanner {
    pub fn new(probe: Arc<dyn HostProbe>, config: &DiscoverConfig) -> Self {
        Self {
            probe,
            concurrency: config.concurrency.max(1),
            max_hosts: config.max_hosts,
            probe_timeout: config.probe_timeout(),
        }
    }

    /// Parse a range using this scanner's host limit.
    pub fn parse_range(&self, input: &str) -> Result<AddressRange> {
        AddressRange::parse(input, self.max_hosts)
    }

    /// Upper bound on how long [`NetworkScanner::scan`] can take for `range`.
    pub fn time_ceiling(&self, range: &AddressRange) -> Duration {
        let waves = range.host_count().div_ceil(self.concurrency as u64).max(1);
        self.abandon_after() * u32::try_from(waves).unwrap_or(u32::MAX)
    }

    fn abandon_after(&self) -> Duration {
        self.probe_timeout + ABANDON_GRACE
    }

    /// Parse `target` and scan it. Fails before any probing if the range is invalid.
    pub async fn scan_target(&self, target: &str) -> Result<ScanSnapshot> {
        let range = self.parse_range(target)?;
        Ok(self.scan(&range).await)
    }

    /// Probe every host of `range` and return the reachable ones.
    pub async fn scan(&self, range: &AddressRange) -> ScanSnapshot {
        let started_at = chrono::Utc::now();
        let start = Instant::now();

        tracing::info!(
            target = %range,
            hosts = range.host_count(),
            concurrency = self.concurrency,
            "Starting scan"
        );

        let mut tasks: JoinSet<ProbeResult> = JoinSet::new();
        let mut results = Vec::new();
        let mut probed = 0usize;

        for address in range.hosts() {
            while tasks.len() >= self.concurrency {
                if let Some(joined) = tasks.join_next().await {
                    collect(joined, &mut results);
                }
            }
            tasks.spawn(probe_bounded(self.probe.clone(), address, self.abandon_after()));
            probed += 1;
        }

        while let Some(joined) = tasks.join_next().await {
            collect(joined, &mut results);
        }

        // A misbehaving probe must not leak addresses from outside the range.
        results.retain(|r| {
            let inside = range.contains(r.address);
            if !inside {
                tracing::warn!(address = %r.address, target = %range, "Discarding out-of-range probe result");
            }
            inside
        });

        let snapshot = ScanSnapshot::new(range.to_string(), results, probed, started_at, start.elapsed());

        tracing::info!(
            target = %range,
            probed = snapshot.probed,
            reachable = snapshot.len(),
            duration_ms = snapshot.duration.as_millis() as u64,
            "Scan complete"
        );

        snapshot
    }
}

async fn probe_bounded(probe: Arc<dyn HostProbe>, address: Ipv4Addr, limit: Duration) -> ProbeResult {
    match timeout(limit, probe.probe(address)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::debug!(%address, ?limit, "Probe exceeded its time limit");
            ProbeResult::unreachable(address)
        }
    }
}

fn collect(joined: std::result::Result<ProbeResult, tokio::task::JoinError>, results: &mut Vec<ProbeResult>) {
    match joined {
        Ok(result) => results.push(result),
        Err(e) => tracing::error!(error = %e, "Probe task panicked"),
    }
}
