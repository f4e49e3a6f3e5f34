//! Activity record type shared by the producer and the consumer.
//!
//! Field names on the wire (and in the record log) follow the column set
//! the downstream cleaning stages read: `event_id`, `session_id`, `is_bot`, ...

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Placeholder for any field missing from an upstream payload.
pub const UNKNOWN: &str = "unknown";

/// Automation kind carried by non-automated records.
pub const NO_AUTOMATION: &str = "none";

/// Timestamp layout used for event time (ISO 8601, microseconds, no zone).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Log columns, in write order.
pub const COLUMNS: [&str; 11] = [
    "event_id",
    "session_id",
    "is_bot",
    "bot_type",
    "action",
    "timestamp",
    "ip_address",
    "user_agent",
    "device_type",
    "browser_family",
    "os_family",
];

/// A single synthetic activity event.
///
/// Decode with [`ActivityRecord::from_wire`], which tolerates partial payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityRecord {
    /// Unique record ID (dedup key)
    #[serde(rename = "event_id")]
    pub record_id: String,
    pub session_id: String,
    /// Ground-truth label, written as 1/0
    #[serde(rename = "is_bot", serialize_with = "serialize_label")]
    pub is_automated: bool,
    #[serde(rename = "bot_type")]
    pub automation_kind: String,
    #[serde(rename = "action")]
    pub action_kind: String,
    pub timestamp: String,
    #[serde(rename = "ip_address")]
    pub source_address: String,
    #[serde(rename = "user_agent")]
    pub client_signature: String,
    #[serde(rename = "device_type")]
    pub device_class: String,
    #[serde(rename = "browser_family")]
    pub client_family: String,
    #[serde(rename = "os_family")]
    pub platform_family: String,
}

fn serialize_label<S: Serializer>(value: &bool, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

impl ActivityRecord {
    /// Decodes a record from a stream payload.
    ///
    /// Any missing, null, or mistyped field is replaced with a placeholder.
    /// Only a payload that is not a JSON object is rejected.
    pub fn from_wire(payload: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(payload)?;
        match value {
            Value::Object(map) => Ok(Self::from_map(&map)),
            other => Err(Error::malformed(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        let is_automated = map.get("is_bot").map(label).unwrap_or(false);
        let kind_placeholder = if is_automated { UNKNOWN } else { NO_AUTOMATION };

        Self {
            record_id: text(map, "event_id", UNKNOWN),
            session_id: text(map, "session_id", UNKNOWN),
            is_automated,
            automation_kind: text(map, "bot_type", kind_placeholder),
            action_kind: text(map, "action", UNKNOWN),
            timestamp: text(map, "timestamp", UNKNOWN),
            source_address: text(map, "ip_address", UNKNOWN),
            client_signature: text(map, "user_agent", UNKNOWN),
            device_class: text(map, "device_type", UNKNOWN),
            client_family: text(map, "browser_family", UNKNOWN),
            platform_family: text(map, "os_family", UNKNOWN),
        }
    }

    /// Encodes the record for publishing.
    pub fn to_wire(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parsed event time, if the timestamp is well formed.
    pub fn event_time(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S"))
            .ok()
    }
}

fn text(map: &Map<String, Value>, key: &str, placeholder: &str) -> String {
    match map.get(key) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => placeholder.to_string(),
    }
}

fn label(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true"),
        _ => false,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
