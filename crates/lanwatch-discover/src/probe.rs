//! Single-host probing: liveness, reverse name, hardware id.
//!
//! Every step shells out to a platform tool under a hard timeout. Step
//! failures degrade the result (no name, sentinel hardware id, or
//! unreachable) and never propagate to the caller.

use std::net::Ipv4Addr;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lanwatch_core::{HardwareId, ProbeResult};
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::DiscoverConfig;
use crate::error::{DiscoverError, Result};
use crate::neighbor;

/// Grace on top of the echo wait before the ping process is killed.
const PING_GRACE: Duration = Duration::from_millis(500);

/// Share of the probe budget held back so a probe returns before its deadline.
const BUDGET_RESERVE_DIVISOR: u32 = 10;

/// Determines liveness and identity of one address.
#[async_trait]
pub trait HostProbe: Send + Sync {
    /// Probe `address`. Must not fail; degraded information is returned instead.
    async fn probe(&self, address: Ipv4Addr) -> ProbeResult;
}

/// Which tool dialect to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    /// The platform this binary was built for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Linux
        }
    }

    /// Arguments for a single echo request with a bounded wait.
    pub fn ping_args(&self, address: Ipv4Addr, wait: Duration) -> Vec<String> {
        let ip = address.to_string();
        match self {
            // `-W` is whole seconds on Linux.
            Self::Linux => {
                let secs = wait.as_millis().div_ceil(1000).max(1);
                vec!["-c".into(), "1".into(), "-W".into(), secs.to_string(), ip]
            }
            // `-W` is milliseconds on macOS.
            Self::MacOs => vec![
                "-c".into(),
                "1".into(),
                "-W".into(),
                wait.as_millis().max(1).to_string(),
                ip,
            ],
            Self::Windows => vec![
                "-n".into(),
                "1".into(),
                "-w".into(),
                wait.as_millis().max(1).to_string(),
                ip,
            ],
        }
    }

    /// Arguments for a neighbor-table query of one address.
    pub fn arp_args(&self, address: Ipv4Addr) -> Vec<String> {
        let ip = address.to_string();
        match self {
            Self::Linux | Self::MacOs => vec!["-n".into(), ip],
            Self::Windows => vec!["-a".into(), ip],
        }
    }
}

/// Why a probe step produced nothing. Logged, never returned.
#[derive(Debug, thiserror::Error)]
enum ProbeError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} timed out after {limit:?}")]
    TimedOut { program: String, limit: Duration },

    #[error("{step} produced no usable output")]
    NoAnswer { step: &'static str },
}

/// [`HostProbe`] backed by the platform's ping, nslookup and arp tools.
///
/// The platform is fixed at construction.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    platform: Platform,
    ping_path: String,
    arp_path: String,
    nslookup_path: String,
    liveness_timeout: Duration,
    probe_timeout: Duration,
}

impl SystemProbe {
    pub fn new(config: &DiscoverConfig) -> Self {
        Self::with_platform(config, Platform::current())
    }

    pub fn with_platform(config: &DiscoverConfig, platform: Platform) -> Self {
        Self {
            platform,
            ping_path: config.ping_path.clone(),
            arp_path: config.arp_path.clone(),
            nslookup_path: config.nslookup_path.clone(),
            liveness_timeout: config.liveness_timeout(),
            probe_timeout: config.probe_timeout(),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Check that the ping tool can be spawned at all.
    ///
    /// A missing ping would turn every scan into an empty result, so this is
    /// worth failing loudly for at startup.
    pub async fn verify_installation(&self) -> Result<()> {
        let loopback = Ipv4Addr::LOCALHOST;
        let args = self.platform.ping_args(loopback, self.liveness_timeout);
        let limit = self.liveness_timeout + PING_GRACE;

        match run_tool(&self.ping_path, &args, limit).await {
            Err(ProbeError::Spawn { .. }) => Err(DiscoverError::ToolNotFound {
                path: self.ping_path.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// The part of `probe_timeout` the tool steps may use.
    fn budget(&self) -> Duration {
        self.probe_timeout - self.probe_timeout / BUDGET_RESERVE_DIVISOR
    }

    async fn is_alive(&self, address: Ipv4Addr) -> std::result::Result<bool, ProbeError> {
        let args = self.platform.ping_args(address, self.liveness_timeout);
        let limit = (self.liveness_timeout + PING_GRACE).min(self.budget());
        let output = run_tool(&self.ping_path, &args, limit).await?;
        Ok(output.status.success())
    }

    async fn resolve_name(&self, address: Ipv4Addr, limit: Duration) -> std::result::Result<String, ProbeError> {
        let output = run_tool(&self.nslookup_path, &[address.to_string()], limit).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        neighbor::parse_reverse_lookup(&stdout, address).ok_or(ProbeError::NoAnswer {
            step: "reverse lookup",
        })
    }

    async fn resolve_hardware_id(
        &self,
        address: Ipv4Addr,
        limit: Duration,
    ) -> std::result::Result<HardwareId, ProbeError> {
        let args = self.platform.arp_args(address);
        let output = run_tool(&self.arp_path, &args, limit).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        neighbor::parse_neighbor_table(self.platform, &stdout, address).ok_or(ProbeError::NoAnswer {
            step: "neighbor table",
        })
    }
}

#[async_trait]
impl HostProbe for SystemProbe {
    async fn probe(&self, address: Ipv4Addr) -> ProbeResult {
        let start = Instant::now();

        match self.is_alive(address).await {
            Ok(true) => {}
            Ok(false) => return ProbeResult::unreachable(address),
            Err(e) => {
                tracing::debug!(%address, error = %e, "Liveness check degraded");
                return ProbeResult::unreachable(address);
            }
        }

        // Identity steps share whatever is left of the budget. A slow resolver
        // costs the name, never the host.
        let remaining = self.budget().saturating_sub(start.elapsed());
        let (name, hardware_id) = tokio::join!(
            self.resolve_name(address, remaining),
            self.resolve_hardware_id(address, remaining),
        );

        let name = name
            .map_err(|e| tracing::debug!(%address, error = %e, "Name resolution degraded"))
            .ok();
        let hardware_id = hardware_id
            .map_err(|e| tracing::debug!(%address, error = %e, "Hardware id resolution degraded"))
            .ok();

        ProbeResult::reachable(address, name, hardware_id)
    }
}

/// Run a tool to completion, killing it if `limit` elapses first.
async fn run_tool(program: &str, args: &[String], limit: Duration) -> std::result::Result<Output, ProbeError> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();

    match timeout(limit, child).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(ProbeError::Spawn {
            program: program.to_string(),
            source,
        }),
        Err(_) => Err(ProbeError::TimedOut {
            program: program.to_string(),
            limit,
        }),
    }
}
