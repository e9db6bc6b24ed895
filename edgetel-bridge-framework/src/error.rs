//! Error types for the bridge framework.

use thiserror::Error;

/// Result type alias using [`BridgeError`].
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors raised by configuration loading and the transports.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    /// The broker or peer could not be reached, or the session dropped.
    #[error("Transport connection error: {0}")]
    Connection(String),

    /// Operation attempted before `connect()` succeeded.
    #[error("Transport is not connected")]
    NotConnected,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Failed to publish to {topic}: {message}")]
    Publish { topic: String, message: String },

    #[error("Failed to subscribe to {topic}: {message}")]
    Subscribe { topic: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ConfigValidation(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn publish(topic: impl Into<String>, msg: impl ToString) -> Self {
        Self::Publish {
            topic: topic.into(),
            message: msg.to_string(),
        }
    }

    pub fn subscribe(topic: impl Into<String>, msg: impl ToString) -> Self {
        Self::Subscribe {
            topic: topic.into(),
            message: msg.to_string(),
        }
    }

    /// Whether retrying later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::NotConnected | Self::Publish { .. } | Self::Io(_)
        )
    }
}

#[cfg(feature = "zenoh")]
impl From<zenoh::Error> for BridgeError {
    fn from(err: zenoh::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

impl From<rumqttc::ConnectionError> for BridgeError {
    fn from(err: rumqttc::ConnectionError) -> Self {
        Self::Connection(err.to_string())
    }
}

impl From<edgetel_common::Error> for BridgeError {
    fn from(err: edgetel_common::Error) -> Self {
        match err {
            edgetel_common::Error::Io(e) => Self::Io(e),
            other => Self::Serialization(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<json5::Error> for BridgeError {
    fn from(err: json5::Error) -> Self {
        Self::ConfigParse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_error_display() {
        let err = BridgeError::publish("/telemetry", "channel closed");
        assert_eq!(
            err.to_string(),
            "Failed to publish to /telemetry: channel closed"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(BridgeError::connection("refused").is_transient());
        assert!(BridgeError::publish("/heartbeat", "queue full").is_transient());
        assert!(!BridgeError::validation("telemetry_topic must be set").is_transient());
        assert!(!BridgeError::ConfigNotFound { path: "x".into() }.is_transient());
    }

    #[test]
    fn test_common_errors_map_to_serialization() {
        let err: BridgeError = edgetel_common::Error::Cbor("truncated".to_string()).into();
        assert!(matches!(err, BridgeError::Serialization(msg) if msg.contains("truncated")));
    }
}
