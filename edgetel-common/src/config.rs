//! Configuration blocks shared by every EdgeTel service.

use serde::{Deserialize, Serialize};

use crate::telemetry::EnvelopeMeta;

/// MQTT broker connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker host name or IP address.
    #[serde(default = "default_mqtt_host")]
    pub host: String,

    /// Broker port.
    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    /// Client identifier. Derived from the device id when unset.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Keep-alive interval in seconds.
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,

    /// Capacity of the client request channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// QoS level for publishes and subscriptions (0, 1 or 2).
    #[serde(default)]
    pub qos: u8,

    /// How long to wait for the broker's CONNACK at startup.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Topic liveness heartbeats are published on.
    #[serde(default = "default_heartbeat_topic")]
    pub heartbeat_topic: String,

    /// Topic the startup registration message is published on.
    #[serde(default = "default_registration_topic")]
    pub registration_topic: String,

    /// Credentials handed to the broker as-is.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_mqtt_host() -> String {
    "localhost".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_keep_alive() -> u64 {
    60
}

fn default_channel_capacity() -> usize {
    10
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_heartbeat_topic() -> String {
    "/heartbeat".to_string()
}

fn default_registration_topic() -> String {
    "/registration".to_string()
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            client_id: None,
            keep_alive_secs: default_keep_alive(),
            channel_capacity: default_channel_capacity(),
            qos: 0,
            connect_timeout_secs: default_connect_timeout(),
            heartbeat_topic: default_heartbeat_topic(),
            registration_topic: default_registration_topic(),
            username: None,
            password: None,
        }
    }
}

/// Zenoh connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZenohConfig {
    /// Zenoh mode: "client", "peer", or "router".
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Endpoints to connect to (for client mode).
    #[serde(default)]
    pub connect: Vec<String>,

    /// Endpoints to listen on (for peer/router mode).
    #[serde(default)]
    pub listen: Vec<String>,

    /// Key expression heartbeats are published on.
    #[serde(default = "default_zenoh_heartbeat")]
    pub heartbeat_key: String,

    /// Key expression the startup registration message is published on.
    #[serde(default = "default_zenoh_registration")]
    pub registration_key: String,
}

fn default_mode() -> String {
    "peer".to_string()
}

fn default_zenoh_heartbeat() -> String {
    "edgetel/heartbeat".to_string()
}

fn default_zenoh_registration() -> String {
    "edgetel/registration".to_string()
}

impl Default for ZenohConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            connect: Vec::new(),
            listen: Vec::new(),
            heartbeat_key: default_zenoh_heartbeat(),
            registration_key: default_zenoh_registration(),
        }
    }
}

/// Which pub/sub transport to use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransportConfig {
    Mqtt(MqttConfig),
    Zenoh(ZenohConfig),
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig::Mqtt(MqttConfig::default())
    }
}

/// Static envelope metadata for a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    #[serde(default = "default_device_type")]
    pub device_type: String,

    /// Prefix of the deployment id; the device id is appended after a dash.
    #[serde(default = "default_deployment_prefix")]
    pub deployment_prefix: String,

    #[serde(default = "default_location")]
    pub current_location: String,

    #[serde(default = "default_status")]
    pub status: String,

    #[serde(default = "default_message_type")]
    pub message_type: String,

    #[serde(default = "default_model_version")]
    pub model_version: String,

    #[serde(default = "default_firmware_version")]
    pub firmware_version: String,
}

fn default_device_type() -> String {
    "Collector".to_string()
}

fn default_deployment_prefix() -> String {
    "AISonobuoy-Arlington".to_string()
}

fn default_location() -> String {
    "-90, -180".to_string()
}

fn default_status() -> String {
    "Debug".to_string()
}

fn default_message_type() -> String {
    "Event".to_string()
}

fn default_model_version() -> String {
    "null".to_string()
}

fn default_firmware_version() -> String {
    "v0.0.0".to_string()
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            device_type: default_device_type(),
            deployment_prefix: default_deployment_prefix(),
            current_location: default_location(),
            status: default_status(),
            message_type: default_message_type(),
            model_version: default_model_version(),
            firmware_version: default_firmware_version(),
        }
    }
}

impl EnvelopeConfig {
    /// Resolve the metadata for a concrete device.
    pub fn meta_for(&self, device_id: &str) -> EnvelopeMeta {
        EnvelopeMeta {
            device_type: self.device_type.clone(),
            id: device_id.to_string(),
            deployment_id: format!("{}-{}", self.deployment_prefix, device_id),
            current_location: self.current_location.clone(),
            status: self.status.clone(),
            message_type: self.message_type.clone(),
            model_version: self.model_version.clone(),
            firmware_version: self.firmware_version.clone(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Common logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}
