//! EdgeTel Common Library
//!
//! This crate provides shared types and utilities for the EdgeTel telemetry services:
//!
//! - [`telemetry`] - Telemetry data model (`TelemetrySnapshot`, `Envelope`, `EnvelopeMeta`)
//! - [`serialization`] - JSON/CBOR encoding and decoding
//! - [`config`] - Shared config blocks (transport, envelope, logging)
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod serialization;
pub mod telemetry;

// Re-export commonly used types at the crate root
pub use config::{
    EnvelopeConfig, LogFormat, LoggingConfig, MqttConfig, TransportConfig, ZenohConfig,
};
pub use error::{Error, Result};
pub use serialization::{Format, decode, decode_auto, encode};
pub use telemetry::{
    Envelope, EnvelopeMeta, TELEMETRY_PAYLOAD_TYPE, TIMESTAMP_FIELD, TelemetrySnapshot,
    current_timestamp_secs,
};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. Text output omits the
/// target module; JSON output puts event fields at the top level.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| Error::Logging(format!("invalid log level '{}': {}", config.level, e)))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Text => registry.with(fmt::layer().with_target(false)).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().flatten_event(true))
            .try_init(),
    };

    installed.map_err(|e| Error::Logging(e.to_string()))
}
