//! Wire encodings for envelopes and control messages.

use serde::{Serialize, de::DeserializeOwned};

use crate::error::{Error, Result};

/// Wire encoding for published envelopes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Plain JSON, what most broker-side consumers expect.
    #[default]
    Json,

    /// CBOR, for links where every byte counts.
    Cbor,
}

impl Format {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Format::Json => "application/json",
            Format::Cbor => "application/cbor",
        }
    }
}

pub fn encode<T: Serialize>(value: &T, format: Format) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    match format {
        Format::Json => serde_json::to_writer(&mut buf, value)?,
        Format::Cbor => ciborium::into_writer(value, &mut buf)?,
    }
    Ok(buf)
}

pub fn decode<T: DeserializeOwned>(data: &[u8], format: Format) -> Result<T> {
    match format {
        Format::Json => Ok(serde_json::from_slice(data)?),
        Format::Cbor => ciborium::from_reader(data).map_err(Error::from),
    }
}

/// Guess the encoding of an inbound payload.
///
/// JSON payloads from other publishers are objects, arrays or strings, possibly
/// preceded by whitespace; anything else is treated as CBOR.
pub fn detect_format(data: &[u8]) -> Format {
    match data.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') | Some(b'[') | Some(b'"') => Format::Json,
        _ => Format::Cbor,
    }
}

/// Decode with [`detect_format`].
pub fn decode_auto<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    decode(data, detect_format(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{Envelope, EnvelopeMeta, TelemetrySnapshot};

    fn envelope() -> Envelope {
        let meta = EnvelopeMeta {
            device_type: "Collector".to_string(),
            id: "pinephone01".to_string(),
            deployment_id: "AISonobuoy-Arlington-pinephone01".to_string(),
            current_location: "-90, -180".to_string(),
            status: "Debug".to_string(),
            message_type: "Event".to_string(),
            model_version: "null".to_string(),
            firmware_version: "v0.0.0".to_string(),
        };
        let snapshot = TelemetrySnapshot::new(1_700_000_000).with_field("battery_percentage", "87");
        Envelope::telemetry(&meta, 1_700_000_000, &snapshot).unwrap()
    }

    #[test]
    fn test_json_roundtrip() {
        let envelope = envelope();

        let encoded = encode(&envelope, Format::Json).unwrap();
        let decoded: Envelope = decode(&encoded, Format::Json).unwrap();

        assert_eq!(envelope, decoded);
    }

    #[test]
    fn test_cbor_roundtrip() {
        let envelope = envelope();

        let encoded = encode(&envelope, Format::Cbor).unwrap();
        let decoded: Envelope = decode(&encoded, Format::Cbor).unwrap();

        assert_eq!(envelope, decoded);
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(detect_format(b"{\"key\": \"value\"}"), Format::Json);
        assert_eq!(detect_format(b"[1, 2, 3]"), Format::Json);
        assert_eq!(detect_format(b"\n  {\"ID\": \"a\"}"), Format::Json);
        assert_eq!(detect_format(b""), Format::Cbor);
        assert_eq!(detect_format(b"\xa1\x63key\x65value"), Format::Cbor);
    }

    #[test]
    fn test_auto_decode() {
        let envelope = envelope();

        let json = encode(&envelope, Format::Json).unwrap();
        let decoded: Envelope = decode_auto(&json).unwrap();
        assert_eq!(envelope.id, decoded.id);

        let cbor = encode(&envelope, Format::Cbor).unwrap();
        let decoded: Envelope = decode_auto(&cbor).unwrap();
        assert_eq!(envelope.id, decoded.id);
    }
}
