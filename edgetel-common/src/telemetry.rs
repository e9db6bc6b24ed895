use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Field name that every snapshot carries.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Payload type tag used for telemetry envelopes.
pub const TELEMETRY_PAYLOAD_TYPE: &str = "Telemetry";

/// One complete set of field -> value readings captured at a single tick.
///
/// Values are always strings, even when numeric, so the envelope schema stays
/// uniform across devices. Fields keep insertion order on the wire, with
/// `timestamp` first for snapshots built by [`TelemetrySnapshot::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TelemetrySnapshot {
    fields: IndexMap<String, String>,
}

impl TelemetrySnapshot {
    /// Create a snapshot holding only the given Unix timestamp (seconds).
    pub fn new(timestamp: i64) -> Self {
        let mut fields = IndexMap::new();
        fields.insert(TIMESTAMP_FIELD.to_string(), timestamp.to_string());
        Self { fields }
    }

    /// Store a field value, returning the previous value if the field was already set.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.fields.insert(field.into(), value.into())
    }

    /// Add a field value (builder style).
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// The snapshot timestamp as stored (Unix seconds, stringified).
    pub fn timestamp(&self) -> Option<&str> {
        self.get(TIMESTAMP_FIELD)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Iterate over field names in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn fields(&self) -> &IndexMap<String, String> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serialize as a compact flat JSON object.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::from)
    }

    /// Parse a flat JSON object.
    ///
    /// Numbers and booleans are stringified; `null`, arrays and nested objects
    /// are rejected. A missing `timestamp` is left missing.
    pub fn from_json(json: &str) -> Result<Self> {
        let object: IndexMap<String, serde_json::Value> = serde_json::from_str(json)?;
        let mut fields = IndexMap::with_capacity(object.len());

        for (key, value) in object {
            let value = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                other => {
                    return Err(Error::NonScalarField {
                        field: key,
                        value: other.to_string(),
                    });
                }
            };
            fields.insert(key, value);
        }

        Ok(Self { fields })
    }
}

/// Static per-deployment metadata stamped on every envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    pub device_type: String,
    pub id: String,
    pub deployment_id: String,
    pub current_location: String,
    pub status: String,
    pub message_type: String,
    pub model_version: String,
    pub firmware_version: String,
}

/// Outer message published to the broker.
///
/// The snapshot travels as a serialized JSON string in `DataPayload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Envelope {
    pub push_timestamp: String,
    pub device_type: String,
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "DeploymentID")]
    pub deployment_id: String,
    pub current_location: String,
    pub status: String,
    pub message_type: String,
    pub model_version: String,
    pub firmware_version: String,
    pub data_payload_type: String,
    pub data_payload: String,
}

impl Envelope {
    /// Wrap an already serialized payload.
    pub fn new(
        meta: &EnvelopeMeta,
        push_timestamp: i64,
        payload_type: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            push_timestamp: push_timestamp.to_string(),
            device_type: meta.device_type.clone(),
            id: meta.id.clone(),
            deployment_id: meta.deployment_id.clone(),
            current_location: meta.current_location.clone(),
            status: meta.status.clone(),
            message_type: meta.message_type.clone(),
            model_version: meta.model_version.clone(),
            firmware_version: meta.firmware_version.clone(),
            data_payload_type: payload_type.into(),
            data_payload: payload.into(),
        }
    }

    /// Wrap a telemetry snapshot.
    pub fn telemetry(
        meta: &EnvelopeMeta,
        push_timestamp: i64,
        snapshot: &TelemetrySnapshot,
    ) -> Result<Self> {
        Ok(Self::new(
            meta,
            push_timestamp,
            TELEMETRY_PAYLOAD_TYPE,
            snapshot.to_json()?,
        ))
    }

    /// Recover the wrapped telemetry snapshot.
    pub fn snapshot(&self) -> Result<TelemetrySnapshot> {
        if self.data_payload_type != TELEMETRY_PAYLOAD_TYPE {
            return Err(Error::PayloadType {
                expected: TELEMETRY_PAYLOAD_TYPE.to_string(),
                found: self.data_payload_type.clone(),
            });
        }
        TelemetrySnapshot::from_json(&self.data_payload)
    }
}

/// Current time in seconds since the Unix epoch.
pub fn current_timestamp_secs() -> i64 {
    chrono::Utc::now().timestamp()
}
