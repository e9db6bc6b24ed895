//! EdgeTel Bridge Framework
//!
//! Common plumbing for services that publish telemetry over a pub/sub transport.
//!
//! # Overview
//!
//! This framework provides:
//! - [`BridgeConfig`] trait for configuration loading and validation
//! - [`Transport`] capability interface with an MQTT adapter and, behind the
//!   default `zenoh` feature, a Zenoh adapter
//! - [`Scheduler`] for fixed-interval jobs driven by one cooperative loop
//! - [`drive`] for the running loop and its [`InterruptPolicy`]
//! - [`BridgeArgs`] for common CLI argument parsing
//!
//! # Example
//!
//! ```ignore
//! use edgetel_bridge_framework::{AnyTransport, Scheduler, Transport, drive};
//!
//! let mut transport = AnyTransport::from_config(&config.transport, "device01")?;
//! transport.connect().await?;
//!
//! let mut scheduler = Scheduler::new().every(Duration::from_secs(10), Job::Heartbeat);
//! let mut interrupts = listen_for_interrupts();
//! drive("mysvc", &mut scheduler, &mut handler, InterruptPolicy::Continue, &mut interrupts).await;
//! ```

mod args;
mod config;
mod error;
mod runner;
mod scheduler;
mod transport;

pub use args::BridgeArgs;
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use runner::{InterruptPolicy, RunState, drive, listen_for_interrupts};
pub use scheduler::{JobHandler, ScheduledJob, Scheduler};
pub use transport::{
    AnyTransport, InboundMessage, MessageHandler, MqttTransport, Transport, topic_matches,
};
#[cfg(feature = "zenoh")]
pub use transport::{ZenohTransport, topic_to_key_expr};

// Re-export commonly used types from edgetel-common
pub use edgetel_common::{
    Envelope, EnvelopeMeta, Format, LoggingConfig, MqttConfig, TelemetrySnapshot,
    TransportConfig, ZenohConfig,
};
