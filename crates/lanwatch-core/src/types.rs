//! Core domain types for LAN discovery.
//!
//! Probe results flow from the scanner into a snapshot, and the reconciler
//! turns snapshot entries into `DeviceRecord` writes against the registry.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LanwatchError;

/// Namespace UUID for deterministic device IDs.
const LANWATCH_NS: Uuid = Uuid::from_bytes([
    0x3c, 0x1e, 0x5a, 0x42, 0x7f, 0x0b, 0x4d, 0x8e, 0x9a, 0x61, 0x2b, 0xd4, 0x0c, 0x77, 0xe1, 0x95,
]);

// ── Hardware identity ─────────────────────────────────────────────

/// A link-layer hardware identifier in canonical `AA:BB:CC:DD:EE:FF` form.
///
/// The all-zero value is a sentinel meaning "not resolved". It must never be
/// treated as a device identity; check [`HardwareId::is_unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HardwareId(String);

impl HardwareId {
    /// Canonical text of the unresolved sentinel.
    pub const UNKNOWN: &'static str = "00:00:00:00:00:00";

    /// The unresolved sentinel.
    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    /// Parse and normalize a hardware id as printed by neighbor tables.
    ///
    /// Accepts `:` or `-` separators, any case, and unpadded octets
    /// (`0:1a:2b:3c:4d:5e`). Returns `None` for anything else.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let sep = if raw.contains(':') { ':' } else { '-' };
        let octets: Vec<&str> = raw.split(sep).collect();
        if octets.len() != 6 {
            return None;
        }

        let mut normalized = Vec::with_capacity(6);
        for octet in octets {
            if octet.is_empty() || octet.len() > 2 {
                return None;
            }
            let value = u8::from_str_radix(octet, 16).ok()?;
            normalized.push(format!("{value:02X}"));
        }
        Some(Self(normalized.join(":")))
    }

    /// True if this is the all-zero "unresolved" sentinel.
    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for HardwareId {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for HardwareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HardwareId {
    type Err = LanwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| LanwatchError::InvalidHardwareId(s.to_string()))
    }
}

impl TryFrom<String> for HardwareId {
    type Error = LanwatchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HardwareId> for String {
    fn from(id: HardwareId) -> Self {
        id.0
    }
}

/// Stable device identifier, derived from the hardware id.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DeviceId(pub Uuid);

impl DeviceId {
    /// Deterministic ID so the same device maps to the same ID everywhere.
    pub fn from_hardware_id(hardware_id: &HardwareId) -> Self {
        Self(Uuid::new_v5(
            &LANWATCH_NS,
            format!("device:{}", hardware_id.as_str()).as_bytes(),
        ))
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Probing ───────────────────────────────────────────────────────

/// Display name used when reverse resolution yields nothing.
pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown";

/// Outcome of probing a single address. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub address: Ipv4Addr,
    pub reachable: bool,
    pub display_name: Option<String>,
    pub hardware_id: HardwareId,
}

impl ProbeResult {
    /// A host that did not answer the liveness check.
    pub fn unreachable(address: Ipv4Addr) -> Self {
        Self {
            address,
            reachable: false,
            display_name: None,
            hardware_id: HardwareId::unknown(),
        }
    }

    /// A live host with whatever identity could be resolved.
    pub fn reachable(
        address: Ipv4Addr,
        display_name: Option<String>,
        hardware_id: Option<HardwareId>,
    ) -> Self {
        Self {
            address,
            reachable: true,
            display_name: Some(display_name.unwrap_or_else(|| UNKNOWN_DISPLAY_NAME.to_string())),
            hardware_id: hardware_id.unwrap_or_default(),
        }
    }

    pub fn display_name_or_unknown(&self) -> &str {
        self.display_name.as_deref().unwrap_or(UNKNOWN_DISPLAY_NAME)
    }
}

/// The reachable hosts found by one scan invocation.
///
/// Only `reachable == true` results are kept; construction filters the rest.
#[derive(Debug, Clone)]
pub struct ScanSnapshot {
    /// The range expression that was scanned.
    pub target: String,
    /// Number of addresses probed.
    pub probed: usize,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    results: Vec<ProbeResult>,
}

impl ScanSnapshot {
    pub fn new(
        target: impl Into<String>,
        results: Vec<ProbeResult>,
        probed: usize,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            target: target.into(),
            probed,
            started_at,
            duration,
            results: results.into_iter().filter(|r| r.reachable).collect(),
        }
    }

    pub fn results(&self) -> &[ProbeResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn contains(&self, address: Ipv4Addr) -> bool {
        self.results.iter().any(|r| r.address == address)
    }
}

// ── Registry records ──────────────────────────────────────────────

/// Operator-assigned device classification.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeviceRole {
    Admin,
    Volunteer,
    #[default]
    Others,
}

impl DeviceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Volunteer => "Volunteer",
            Self::Others => "Others",
        }
    }
}

impl FromStr for DeviceRole {
    type Err = LanwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "volunteer" => Ok(Self::Volunteer),
            "others" => Ok(Self::Others),
            _ => Err(LanwatchError::Internal(format!("Unknown device role: {s}"))),
        }
    }
}

/// Operator-assigned device status.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    #[default]
    Active,
    Blocked,
    Kicked,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Blocked => "blocked",
            Self::Kicked => "kicked",
        }
    }
}

impl FromStr for DeviceStatus {
    type Err = LanwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "blocked" => Ok(Self::Blocked),
            "kicked" => Ok(Self::Kicked),
            _ => Err(LanwatchError::Internal(format!("Unknown device status: {s}"))),
        }
    }
}

/// A device as held by the registry, keyed by `hardware_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: DeviceId,
    pub hardware_id: HardwareId,
    pub address: Ipv4Addr,
    pub display_name: String,
    pub role: DeviceRole,
    pub status: DeviceStatus,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl DeviceRecord {
    /// A first sighting: baseline role, active status.
    pub fn discovered(result: &ProbeResult, now: DateTime<Utc>) -> Self {
        Self {
            id: DeviceId::from_hardware_id(&result.hardware_id),
            hardware_id: result.hardware_id.clone(),
            address: result.address,
            display_name: result.display_name_or_unknown().to_string(),
            role: DeviceRole::default(),
            status: DeviceStatus::default(),
            first_seen: now,
            last_seen: now,
        }
    }

    /// A repeat sighting. Only address, display name and last-seen change;
    /// identity, role and status are carried over untouched.
    pub fn refreshed(&self, result: &ProbeResult, now: DateTime<Utc>) -> Self {
        Self {
            address: result.address,
            display_name: result.display_name_or_unknown().to_string(),
            last_seen: now,
            ..self.clone()
        }
    }
}

/// Aggregate outcome of reconciling one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileCounts {
    pub total_discovered: usize,
    pub new_count: usize,
    pub updated_count: usize,
    /// Entries whose registry lookup or write failed.
    pub failed_count: usize,
    /// Entries skipped because no hardware id could be resolved.
    pub unidentified_count: usize,
}
