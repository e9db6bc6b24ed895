//! Configuration for the telemetry publisher.
//!
//! Values come from built-in defaults, an optional JSON5 file, and finally
//! environment variables or command-line flags, later sources winning.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use clap::builder::BoolishValueParser;
use serde::{Deserialize, Serialize};

use edgetel_bridge_framework::{
    BridgeArgs, BridgeConfig, BridgeError, InterruptPolicy, LoggingConfig, Result,
    TransportConfig,
};
use edgetel_common::{EnvelopeConfig, Format, TIMESTAMP_FIELD};

use crate::publisher::PublisherSettings;
use crate::source::{FieldSource, SnapshotSource};

/// Complete publisher configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Pub/sub transport (MQTT by default).
    #[serde(default)]
    pub transport: TransportConfig,

    /// Telemetry collection settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Static envelope metadata.
    #[serde(default)]
    pub envelope: EnvelopeConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Telemetry collection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Destination topic for snapshots.
    #[serde(default)]
    pub telemetry_topic: String,

    /// Optional inbound control topic.
    #[serde(default)]
    pub control_topic: Option<String>,

    /// Device id. Use "auto" to detect automatically (default).
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Per-field file sources.
    #[serde(default)]
    pub sources: Vec<FieldSource>,

    /// Single pre-aggregated JSON file, alternative to `sources`.
    #[serde(default)]
    pub telemetry_file: Option<PathBuf>,

    /// Telemetry interval in seconds (default: 60).
    #[serde(default = "default_telemetry_interval")]
    pub telemetry_interval_secs: u64,

    /// Heartbeat interval in seconds (default: 10).
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// Local file every snapshot is appended to.
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Verbose logging.
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub on_interrupt: InterruptPolicy,

    /// Wire encoding of published envelopes.
    #[serde(default)]
    pub format: Format,

    #[serde(default = "default_heartbeat_payload")]
    pub heartbeat_payload: String,

    #[serde(default = "default_registration_payload")]
    pub registration_payload: String,
}

fn default_hostname() -> String {
    "auto".to_string()
}

fn default_telemetry_interval() -> u64 {
    60
}

fn default_heartbeat_interval() -> u64 {
    10
}

fn default_heartbeat_payload() -> String {
    "Telemetry Module Heartbeat".to_string()
}

fn default_registration_payload() -> String {
    "Telemetry Module Registration".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            telemetry_topic: String::new(),
            control_topic: None,
            hostname: default_hostname(),
            sources: Vec::new(),
            telemetry_file: None,
            telemetry_interval_secs: default_telemetry_interval(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            log_file: None,
            debug: false,
            on_interrupt: InterruptPolicy::default(),
            format: Format::default(),
            heartbeat_payload: default_heartbeat_payload(),
            registration_payload: default_registration_payload(),
        }
    }
}

/// Command-line arguments, each with an environment fallback.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "edgetel-publisher", version, about = "Publish device telemetry on a schedule")]
pub struct PublisherArgs {
    #[command(flatten)]
    pub bridge: BridgeArgs,

    /// Destination topic for snapshots
    #[arg(long, env = "TELEMETRY_TOPIC")]
    pub telemetry_topic: Option<String>,

    /// Comma-separated field names
    #[arg(long, env = "TELEMETRY_VARIABLES")]
    pub telemetry_variables: Option<String>,

    /// Comma-separated source paths, one per field name
    #[arg(long, env = "TELEMETRY_FILE_LOCATIONS")]
    pub telemetry_file_locations: Option<String>,

    /// Pre-aggregated JSON snapshot file
    #[arg(long, env = "TELEMETRY_FILE")]
    pub telemetry_file: Option<PathBuf>,

    /// Inbound control topic
    #[arg(long, env = "CONTROL_TOPIC")]
    pub control_topic: Option<String>,

    /// Device id ("auto" to detect)
    #[arg(long, env = "HOSTNAME")]
    pub hostname: Option<String>,

    /// Append every snapshot to this file
    #[arg(long, env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Verbose logging (env accepts 1/0, true/false, yes/no, on/off)
    #[arg(long, env = "DEBUG", value_parser = BoolishValueParser::new())]
    pub debug: bool,

    /// MQTT broker host
    #[arg(long = "broker-address", env = "MQTT_IP")]
    pub broker_address: Option<String>,

    /// MQTT broker port
    #[arg(long = "broker-port", env = "MQTT_PORT")]
    pub broker_port: Option<u16>,

    /// Telemetry interval in seconds
    #[arg(long, env = "TELEMETRY_INTERVAL_SECS")]
    pub telemetry_interval_secs: Option<u64>,

    /// What to do on Ctrl+C: continue or shutdown
    #[arg(long, env = "ON_INTERRUPT")]
    pub on_interrupt: Option<InterruptPolicy>,
}

impl PublisherConfig {
    /// Load the optional config file, apply overrides and validate.
    pub fn resolve(args: &PublisherArgs) -> Result<Self> {
        let mut config = match &args.bridge.config {
            Some(path) => Self::load_unvalidated(path)?,
            None => Self::default(),
        };
        config.apply_args(args)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment and command-line values.
    pub fn apply_args(&mut self, args: &PublisherArgs) -> Result<()> {
        let telemetry = &mut self.telemetry;

        if let Some(topic) = &args.telemetry_topic {
            telemetry.telemetry_topic = topic.clone();
        }

        match (&args.telemetry_variables, &args.telemetry_file_locations) {
            (Some(fields), Some(paths)) => {
                telemetry.sources = field_sources_from_lists(fields, paths)?;
            }
            (None, None) => {}
            _ => {
                return Err(BridgeError::validation(
                    "telemetry_variables and telemetry_file_locations must be given together",
                ));
            }
        }

        if let Some(file) = &args.telemetry_file {
            telemetry.telemetry_file = Some(file.clone());
        }
        if let Some(topic) = &args.control_topic {
            telemetry.control_topic = Some(topic.clone());
        }
        if let Some(hostname) = &args.hostname {
            telemetry.hostname = hostname.clone();
        }
        if let Some(log_file) = &args.log_file {
            telemetry.log_file = Some(log_file.clone());
        }
        if args.debug {
            telemetry.debug = true;
        }
        if let Some(secs) = args.telemetry_interval_secs {
            telemetry.telemetry_interval_secs = secs;
        }
        if let Some(policy) = args.on_interrupt {
            telemetry.on_interrupt = policy;
        }

        if args.broker_address.is_some() || args.broker_port.is_some() {
            let TransportConfig::Mqtt(mqtt) = &mut self.transport else {
                return Err(BridgeError::validation(
                    "broker address and port only apply to the mqtt transport",
                ));
            };
            if let Some(host) = &args.broker_address {
                mqtt.host = host.clone();
            }
            if let Some(port) = args.broker_port {
                mqtt.port = port;
            }
        }

        if self.telemetry.debug {
            self.logging.level = "debug".to_string();
        }
        if let Some(level) = &args.bridge.log_level {
            self.logging.level = level.clone();
        }

        Ok(())
    }

    /// Get the device id to use, resolving "auto" if needed.
    pub fn device_id(&self) -> String {
        if self.telemetry.hostname == "auto" {
            hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "unknown".to_string())
        } else {
            self.telemetry.hostname.clone()
        }
    }

    /// The configured snapshot source. Only meaningful after validation.
    pub fn snapshot_source(&self) -> SnapshotSource {
        match &self.telemetry.telemetry_file {
            Some(path) => SnapshotSource::Aggregate(path.clone()),
            None => SnapshotSource::Fields(self.telemetry.sources.clone()),
        }
    }

    /// Runtime settings for a publisher on `device_id`.
    pub fn settings(&self, device_id: &str) -> PublisherSettings {
        let telemetry = &self.telemetry;
        PublisherSettings {
            telemetry_topic: telemetry.telemetry_topic.clone(),
            control_topic: telemetry.control_topic.clone(),
            source: self.snapshot_source(),
            meta: self.envelope.meta_for(device_id),
            format: telemetry.format,
            log_file: telemetry.log_file.clone(),
            heartbeat_payload: telemetry.heartbeat_payload.clone(),
            registration_payload: telemetry.registration_payload.clone(),
            heartbeat_interval: Duration::from_secs(telemetry.heartbeat_interval_secs),
            telemetry_interval: Duration::from_secs(telemetry.telemetry_interval_secs),
            on_interrupt: telemetry.on_interrupt,
        }
    }
}

impl BridgeConfig for PublisherConfig {
    fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    fn validate(&self) -> Result<()> {
        let telemetry = &self.telemetry;

        if telemetry.telemetry_topic.trim().is_empty() {
            return Err(BridgeError::validation("telemetry_topic must be set"));
        }
        if telemetry.telemetry_interval_secs == 0 {
            return Err(BridgeError::validation(
                "telemetry_interval_secs must be > 0",
            ));
        }
        if telemetry.heartbeat_interval_secs == 0 {
            return Err(BridgeError::validation(
                "heartbeat_interval_secs must be > 0",
            ));
        }

        match (telemetry.sources.is_empty(), &telemetry.telemetry_file) {
            (true, None) => {
                return Err(BridgeError::validation(
                    "configure either telemetry sources or telemetry_file",
                ));
            }
            (false, Some(_)) => {
                return Err(BridgeError::validation(
                    "telemetry sources and telemetry_file are mutually exclusive",
                ));
            }
            _ => {}
        }

        let mut seen = HashSet::new();
        for source in &telemetry.sources {
            if source.field.is_empty() {
                return Err(BridgeError::validation("field names must not be empty"));
            }
            if source.field == TIMESTAMP_FIELD {
                return Err(BridgeError::validation(format!(
                    "'{}' is reserved and cannot be a field name",
                    TIMESTAMP_FIELD
                )));
            }
            if !seen.insert(source.field.as_str()) {
                return Err(BridgeError::validation(format!(
                    "duplicate field name '{}'",
                    source.field
                )));
            }
            if source.path.as_os_str().is_empty() {
                return Err(BridgeError::validation(format!(
                    "field '{}' has an empty path",
                    source.field
                )));
            }
        }

        if let Some(topic) = &telemetry.control_topic
            && topic.trim().is_empty()
        {
            return Err(BridgeError::validation("control_topic must not be empty"));
        }

        Ok(())
    }
}

/// Pair up comma-separated field names and paths.
pub fn field_sources_from_lists(fields: &str, paths: &str) -> Result<Vec<FieldSource>> {
    let fields = split_list(fields);
    let paths = split_list(paths);

    if fields.len() != paths.len() {
        return Err(BridgeError::validation(format!(
            "{} telemetry variables but {} file locations",
            fields.len(),
            paths.len()
        )));
    }

    Ok(fields
        .into_iter()
        .zip(paths)
        .map(|(field, path)| FieldSource::new(field, path))
        .collect())
}

fn split_list(list: &str) -> Vec<&str> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Transform;

    fn args() -> PublisherArgs {
        PublisherArgs::default()
    }

    #[test]
    fn test_parse_minimal_config() {
        let json = r#"{
            telemetry: {
                telemetry_topic: "/telemetry",
                telemetry_file: "/home/mobian/telemetry_data/telemetry_data.json"
            }
        }"#;

        let config: PublisherConfig = json5::from_str(json).unwrap();
        config.validate().unwrap();

        assert_eq!(config.telemetry.hostname, "auto");
        assert_eq!(config.telemetry.telemetry_interval_secs, 60);
        assert_eq!(config.telemetry.heartbeat_interval_secs, 10);
        assert_eq!(config.telemetry.on_interrupt, InterruptPolicy::Continue);
        assert_eq!(config.telemetry.format, Format::Json);
        assert!(matches!(config.transport, TransportConfig::Mqtt(ref m) if m.port == 1883));
        assert!(matches!(
            config.snapshot_source(),
            SnapshotSource::Aggregate(_)
        ));
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            transport: { kind: "mqtt", host: "broker.local", port: 8883, qos: 1 },
            telemetry: {
                telemetry_topic: "/telemetry",
                control_topic: "/control/pinephone01",
                hostname: "pinephone01",
                sources: [
                    { field: "battery_percentage", path: "/sys/class/power_supply/battery/capacity" },
                    { field: "cpu_temp", path: "/sys/class/thermal/thermal_zone0/temp",
                      transform: { rule: "leading_chars", count: 3 } },
                ],
                telemetry_interval_secs: 30,
                log_file: "/var/log/telemetry.log",
                on_interrupt: "shutdown",
                format: "cbor"
            },
            envelope: { deployment_prefix: "Harbor" },
            logging: { level: "warn", format: "json" }
        }"#;

        let config: PublisherConfig = json5::from_str(json).unwrap();
        config.validate().unwrap();

        assert_eq!(config.device_id(), "pinephone01");
        assert_eq!(config.telemetry.sources.len(), 2);
        assert_eq!(
            config.telemetry.sources[1].rule(),
            Transform::LeadingChars { count: 3 }
        );

        let settings = config.settings("pinephone01");
        assert_eq!(settings.telemetry_interval, Duration::from_secs(30));
        assert_eq!(settings.meta.deployment_id, "Harbor-pinephone01");
        assert_eq!(settings.on_interrupt, InterruptPolicy::Shutdown);
        assert_eq!(settings.format, Format::Cbor);
        assert_eq!(settings.source.field_count(), Some(2));
    }

    #[test]
    fn test_args_override_file() {
        let mut config: PublisherConfig = json5::from_str(
            r#"{ telemetry: { telemetry_topic: "/old", telemetry_file: "/tmp/agg.json" } }"#,
        )
        .unwrap();

        let args = PublisherArgs {
            telemetry_topic: Some("/telemetry".to_string()),
            broker_address: Some("10.0.0.5".to_string()),
            hostname: Some("unit7".to_string()),
            debug: true,
            ..args()
        };
        config.apply_args(&args).unwrap();
        config.validate().unwrap();

        assert_eq!(config.telemetry.telemetry_topic, "/telemetry");
        assert_eq!(config.device_id(), "unit7");
        assert_eq!(config.logging.level, "debug");
        match &config.transport {
            TransportConfig::Mqtt(mqtt) => {
                assert_eq!(mqtt.host, "10.0.0.5");
                assert_eq!(mqtt.port, 1883);
            }
            other => panic!("unexpected transport {:?}", other),
        }
    }

    #[test]
    fn test_lists_from_env_style_args() {
        let mut config = PublisherConfig::default();
        let args = PublisherArgs {
            telemetry_topic: Some("/telemetry".to_string()),
            telemetry_variables: Some("battery_percentage, cpu_temp".to_string()),
            telemetry_file_locations: Some("/sys/a,/sys/b".to_string()),
            ..args()
        };
        config.apply_args(&args).unwrap();
        config.validate().unwrap();

        assert_eq!(
            config.telemetry.sources,
            vec![
                FieldSource::new("battery_percentage", "/sys/a"),
                FieldSource::new("cpu_temp", "/sys/b"),
            ]
        );
    }

    #[test]
    fn test_list_length_mismatch() {
        let err = field_sources_from_lists("a,b,c", "/x,/y").unwrap_err();
        assert!(matches!(err, BridgeError::ConfigValidation(_)));
    }

    #[test]
    fn test_half_list_rejected() {
        let mut config = PublisherConfig::default();
        let args = PublisherArgs {
            telemetry_variables: Some("battery_percentage".to_string()),
            ..args()
        };
        assert!(config.apply_args(&args).is_err());
    }

    #[test]
    fn test_validate_rejections() {
        let base = || PublisherConfig {
            telemetry: TelemetryConfig {
                telemetry_topic: "/telemetry".to_string(),
                sources: vec![FieldSource::new("battery_percentage", "/sys/a")],
                ..TelemetryConfig::default()
            },
            ..PublisherConfig::default()
        };
        base().validate().unwrap();

        let mut config = base();
        config.telemetry.telemetry_topic.clear();
        assert!(config.validate().is_err());

        let mut config = base();
        config.telemetry.telemetry_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = base();
        config.telemetry.heartbeat_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = base();
        config.telemetry.sources.push(FieldSource::new("timestamp", "/sys/t"));
        assert!(config.validate().is_err());

        let mut config = base();
        config
            .telemetry
            .sources
            .push(FieldSource::new("battery_percentage", "/sys/b"));
        assert!(config.validate().is_err());

        let mut config = base();
        config.telemetry.telemetry_file = Some(PathBuf::from("/tmp/agg.json"));
        assert!(config.validate().is_err());

        let mut config = base();
        config.telemetry.sources.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_broker_override_requires_mqtt() {
        let mut config: PublisherConfig =
            json5::from_str(r#"{ transport: { kind: "zenoh", mode: "client" } }"#).unwrap();
        let args = PublisherArgs {
            broker_address: Some("10.0.0.5".to_string()),
            ..args()
        };
        assert!(config.apply_args(&args).is_err());
    }

    #[test]
    fn test_cli_parse() {
        let args = PublisherArgs::try_parse_from([
            "edgetel-publisher",
            "--telemetry-topic",
            "/telemetry",
            "--telemetry-file",
            "/tmp/agg.json",
            "--on-interrupt",
            "shutdown",
            "--broker-port",
            "1884",
        ])
        .unwrap();

        assert_eq!(args.telemetry_topic.as_deref(), Some("/telemetry"));
        assert_eq!(args.on_interrupt, Some(InterruptPolicy::Shutdown));
        assert_eq!(args.broker_port, Some(1884));
    }
}
