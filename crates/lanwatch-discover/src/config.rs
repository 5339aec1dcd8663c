//! Configuration for subnet discovery.

use std::time::Duration;

use serde::Deserialize;

/// `[discover]` configuration section.
///
/// Loaded from `lanwatch.toml` or `LANWATCH__DISCOVER__*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverConfig {
    /// Maximum probes in flight at once. Each probe spawns external processes.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Wait for a single echo reply.
    #[serde(default = "default_liveness_timeout_ms")]
    pub liveness_timeout_ms: u64,

    /// Hard ceiling for one probe, identity resolution included.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Largest range (in host addresses) a scan will accept.
    #[serde(default = "default_max_hosts")]
    pub max_hosts: usize,

    #[serde(default = "default_ping_path")]
    pub ping_path: String,

    #[serde(default = "default_arp_path")]
    pub arp_path: String,

    #[serde(default = "default_nslookup_path")]
    pub nslookup_path: String,

    /// CIDR scanned when a trigger names no range. Unset means the local /24.
    #[serde(default)]
    pub default_range: Option<String>,
}

impl DiscoverConfig {
    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.liveness_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

fn default_concurrency() -> usize {
    50
}

fn default_liveness_timeout_ms() -> u64 {
    1000
}

fn default_probe_timeout_ms() -> u64 {
    2000
}

fn default_max_hosts() -> usize {
    65_536
}

fn default_ping_path() -> String {
    "ping".to_string()
}

fn default_arp_path() -> String {
    "arp".to_string()
}

fn default_nslookup_path() -> String {
    "nslookup".to_string()
}

impl Default for DiscoverConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            liveness_timeout_ms: default_liveness_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            max_hosts: default_max_hosts(),
            ping_path: default_ping_path(),
            arp_path: default_arp_path(),
            nslookup_path: default_nslookup_path(),
            default_range: None,
        }
    }
}
