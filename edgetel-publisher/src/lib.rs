//! Scheduled telemetry publisher for edge devices.
//!
//! Reads device readings from local files (or one pre-aggregated JSON file),
//! normalizes each value with a per-field [`Transform`], wraps the snapshot
//! in an [`Envelope`](edgetel_common::Envelope) and publishes it over the
//! configured transport. A heartbeat is published on a faster schedule.
//!
//! # Topics
//!
//! ```text
//! <telemetry_topic>      Envelope{DataPayloadType: "Telemetry"}  every 60s
//! /heartbeat             "Telemetry Module Heartbeat"           every 10s
//! /registration          "Telemetry Module Registration"        once at startup
//! <control_topic>        inbound, optional
//! ```

pub mod config;
pub mod error;
pub mod publisher;
pub mod source;
pub mod transform;

pub use config::{PublisherArgs, PublisherConfig, TelemetryConfig};
pub use error::{PublisherError, Result};
pub use publisher::{
    ControlHandler, ControlMessage, ControlPayload, PublisherJob, PublisherSettings,
    TelemetryPublisher, TickStats, decode_control, mirror_snapshot,
};
pub use source::{FieldSource, SnapshotSource};
pub use transform::{Transform, TransformError, apply_transformation};
