//! Event types disseminated to live dashboard observers.
//!
//! An `Event` is a tagged bag of JSON fields plus a timestamp. On the wire it
//! is a flat object: `{"type": kind, ...payload, "timestamp": ISO-8601}`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{json, Map, Value};

use crate::types::{DeviceId, DeviceRecord, DeviceRole, DeviceStatus, HardwareId, ReconcileCounts};

/// Event kind tags.
pub mod kinds {
    pub const SCAN_COMPLETE: &str = "scan_complete";
    pub const NEW_DEVICE: &str = "new_device";
    pub const DEVICE_UPDATED: &str = "device_updated";
    pub const DEVICE_DELETED: &str = "device_deleted";
    pub const DEVICE_KICKED: &str = "device_kicked";
    pub const FIREWALL_ACTION: &str = "firewall_action";
    pub const USER_CREATED: &str = "user_created";
    pub const USER_DELETED: &str = "user_deleted";
    pub const USER_KICKED: &str = "user_kicked";
}

/// Wire keys owned by the envelope; payload entries with these names are dropped.
const RESERVED_KEYS: [&str; 2] = ["type", "timestamp"];

/// An immutable state-change descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    kind: String,
    payload: Map<String, Value>,
    timestamp: DateTime<Utc>,
}

impl Event {
    /// Build an event stamped with the current time.
    pub fn new(kind: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self::at(kind, payload, Utc::now())
    }

    /// Build an event with an explicit timestamp.
    pub fn at(kind: impl Into<String>, mut payload: Map<String, Value>, timestamp: DateTime<Utc>) -> Self {
        for key in RESERVED_KEYS {
            payload.remove(key);
        }
        Self {
            kind: kind.into(),
            payload,
            timestamp,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The flat wire representation as a JSON value.
    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.payload.len() + 2);
        map.insert("type".to_string(), Value::String(self.kind.clone()));
        for (k, v) in &self.payload {
            map.insert(k.clone(), v.clone());
        }
        map.insert("timestamp".to_string(), Value::String(self.wire_timestamp()));
        Value::Object(map)
    }

    fn wire_timestamp(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn from_fields(kind: &str, fields: Value) -> Self {
        match fields {
            Value::Object(map) => Self::new(kind, map),
            _ => Self::new(kind, Map::new()),
        }
    }

    // ── Discovery ─────────────────────────────────────────────────

    /// Summary of one scan-and-reconcile run.
    pub fn scan_complete(counts: &ReconcileCounts) -> Self {
        Self::from_fields(
            kinds::SCAN_COMPLETE,
            json!({
                "new_devices": counts.new_count,
                "updated_devices": counts.updated_count,
                "failed_devices": counts.failed_count,
                "total": counts.total_discovered,
            }),
        )
    }

    /// A device the registry had never seen before.
    pub fn new_device(record: &DeviceRecord) -> Self {
        Self::from_fields(
            kinds::NEW_DEVICE,
            json!({
                "device_id": record.id,
                "mac": record.hardware_id,
                "ip": record.address.to_string(),
                "hostname": record.display_name,
                "level": "info",
                "message": format!(
                    "New device detected: {} ({})",
                    record.display_name, record.address
                ),
            }),
        )
    }

    // ── Device management ─────────────────────────────────────────

    pub fn device_updated(
        device_id: DeviceId,
        hardware_id: &HardwareId,
        role: DeviceRole,
        status: DeviceStatus,
        updated_by: &str,
    ) -> Self {
        Self::from_fields(
            kinds::DEVICE_UPDATED,
            json!({
                "device_id": device_id,
                "mac": hardware_id,
                "role": role,
                "status": status,
                "updated_by": updated_by,
            }),
        )
    }

    pub fn device_deleted(device_id: DeviceId, deleted_by: &str) -> Self {
        Self::from_fields(
            kinds::DEVICE_DELETED,
            json!({ "device_id": device_id, "deleted_by": deleted_by }),
        )
    }

    pub fn device_kicked(device_id: DeviceId, ip: &str, hostname: &str, kicked_by: &str) -> Self {
        Self::from_fields(
            kinds::DEVICE_KICKED,
            json!({
                "device_id": device_id,
                "ip": ip,
                "hostname": hostname,
                "kicked_by": kicked_by,
            }),
        )
    }

    // ── Firewall ──────────────────────────────────────────────────

    pub fn firewall_action(action: &str, ip: &str, success: bool, message: &str, admin: &str) -> Self {
        Self::from_fields(
            kinds::FIREWALL_ACTION,
            json!({
                "action": action,
                "ip": ip,
                "success": success,
                "message": message,
                "admin": admin,
            }),
        )
    }

    // ── User management ───────────────────────────────────────────

    pub fn user_created(username: &str, role: &str, created_by: &str) -> Self {
        Self::from_fields(
            kinds::USER_CREATED,
            json!({ "username": username, "role": role, "created_by": created_by }),
        )
    }

    pub fn user_deleted(username: &str, deleted_by: &str) -> Self {
        Self::from_fields(
            kinds::USER_DELETED,
            json!({ "username": username, "deleted_by": deleted_by }),
        )
    }

    pub fn user_kicked(user_id: i64, username: &str, kicked_by: &str) -> Self {
        Self::from_fields(
            kinds::USER_KICKED,
            json!({ "user_id": user_id, "username": username, "kicked_by": kicked_by }),
        )
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.payload.len() + 2))?;
        map.serialize_entry("type", &self.kind)?;
        for (k, v) in &self.payload {
            map.serialize_entry(k, v)?;
        }
        map.serialize_entry("timestamp", &self.wire_timestamp())?;
        map.end()
    }
}
