//! The scheduled telemetry publisher.
//!
//! [`TelemetryPublisher`] owns a [`Transport`] and runs two jobs on one
//! cooperative loop: a liveness heartbeat and a telemetry snapshot. Every
//! failure inside a tick is logged and contained to that tick; only the
//! initial connection is fatal.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use edgetel_bridge_framework::{
    InboundMessage, InterruptPolicy, JobHandler, MessageHandler, RunState, Scheduler, Transport,
    drive,
};
use edgetel_common::{
    Envelope, EnvelopeMeta, Format, TELEMETRY_PAYLOAD_TYPE, TelemetrySnapshot,
    current_timestamp_secs, decode_auto, encode,
};

use crate::error::{PublisherError, Result};
use crate::source::SnapshotSource;

/// Jobs registered with the scheduler, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublisherJob {
    Heartbeat,
    Telemetry,
}

/// Everything a publisher needs at runtime.
#[derive(Debug, Clone)]
pub struct PublisherSettings {
    pub telemetry_topic: String,
    pub control_topic: Option<String>,
    pub source: SnapshotSource,
    pub meta: EnvelopeMeta,
    pub format: Format,
    pub log_file: Option<PathBuf>,
    pub heartbeat_payload: String,
    pub registration_payload: String,
    pub heartbeat_interval: Duration,
    pub telemetry_interval: Duration,
    pub on_interrupt: InterruptPolicy,
}

/// Tick counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub heartbeats_sent: u64,
    pub heartbeat_failures: u64,
    pub snapshots_published: u64,
    /// Telemetry ticks where the snapshot could not be assembled.
    pub ticks_skipped: u64,
    pub publish_failures: u64,
}

/// Decoded content of a control message.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPayload {
    Envelope(Envelope),
    Json(serde_json::Value),
}

/// A message received on the control topic.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlMessage {
    pub topic: String,
    pub payload: ControlPayload,
}

/// Callback for decoded control messages.
pub type ControlHandler = Arc<dyn Fn(ControlMessage) + Send + Sync>;

/// Decode an inbound control payload, preferring the envelope shape.
///
/// Envelopes may arrive as JSON or CBOR; anything else must be JSON.
pub fn decode_control(message: &InboundMessage) -> Result<ControlMessage> {
    let payload = match decode_auto::<Envelope>(&message.payload) {
        Ok(envelope) => ControlPayload::Envelope(envelope),
        Err(_) => ControlPayload::Json(
            serde_json::from_slice(&message.payload).map_err(edgetel_common::Error::from)?,
        ),
    };

    Ok(ControlMessage {
        topic: message.topic.clone(),
        payload,
    })
}

fn log_control_message(message: ControlMessage) {
    match &message.payload {
        ControlPayload::Envelope(envelope) => info!(
            topic = %message.topic,
            payload_type = %envelope.data_payload_type,
            from = %envelope.id,
            "Control message received"
        ),
        ControlPayload::Json(value) => info!(
            topic = %message.topic,
            payload = %value,
            "Control message received"
        ),
    }
}

/// Append one `<timestamp> <json>` line to the mirror log.
pub async fn mirror_snapshot(path: &Path, snapshot: &TelemetrySnapshot) -> Result<()> {
    let json = snapshot.to_json()?;
    let line = format!("{} {}\n", snapshot.timestamp().unwrap_or_default(), json);

    let mirror_err = |source| PublisherError::Mirror {
        path: path.to_path_buf(),
        source,
    };

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(mirror_err)?;
    file.write_all(line.as_bytes()).await.map_err(mirror_err)?;
    file.flush().await.map_err(mirror_err)?;

    Ok(())
}

/// Scheduled publisher of heartbeats and telemetry snapshots.
pub struct TelemetryPublisher<T: Transport> {
    transport: T,
    settings: PublisherSettings,
    state: RunState,
    stats: TickStats,
    control_handler: ControlHandler,
}

impl<T: Transport> TelemetryPublisher<T> {
    pub fn new(transport: T, settings: PublisherSettings) -> Self {
        Self {
            transport,
            settings,
            state: RunState::Disconnected,
            stats: TickStats::default(),
            control_handler: Arc::new(log_control_message),
        }
    }

    /// Replace the handler for control messages. Takes effect at [`start`](Self::start).
    pub fn with_control_handler(mut self, handler: ControlHandler) -> Self {
        self.control_handler = handler;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn stats(&self) -> TickStats {
        self.stats
    }

    pub fn settings(&self) -> &PublisherSettings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Connect, announce and subscribe. A connection failure is returned as is.
    pub async fn start(&mut self) -> Result<()> {
        self.transport.connect().await?;
        self.state = RunState::Running;
        info!(device = %self.settings.meta.id, state = %self.state, "Transport connected");

        match self
            .transport
            .publish_registration(&self.settings.registration_payload)
            .await
        {
            Ok(()) => info!(topic = %self.transport.registration_topic(), "Registration published"),
            Err(e) => warn!(
                error = %e,
                transient = e.is_transient(),
                "Failed to publish registration"
            ),
        }

        if let Some(topic) = &self.settings.control_topic {
            let handler = self.control_handler.clone();
            let on_message: MessageHandler =
                Arc::new(move |message: InboundMessage| match decode_control(&message) {
                    Ok(control) => handler(control),
                    Err(e) => warn!(topic = %message.topic, error = %e, "Undecodable control message"),
                });

            match self.transport.subscribe(topic, on_message).await {
                Ok(()) => info!(topic = %topic, "Subscribed to control topic"),
                Err(e) => warn!(topic = %topic, error = %e, "Failed to subscribe to control topic"),
            }
        }

        Ok(())
    }

    /// Scheduler with the heartbeat registered before telemetry.
    pub fn scheduler(&self) -> Scheduler<PublisherJob> {
        Scheduler::new()
            .every(self.settings.heartbeat_interval, PublisherJob::Heartbeat)
            .every(self.settings.telemetry_interval, PublisherJob::Telemetry)
    }

    /// Run ticks until the interrupt policy ends the loop.
    pub async fn run(&mut self, interrupts: &mut mpsc::Receiver<()>) {
        if self.state != RunState::Running {
            error!(state = %self.state, "Publisher started before connecting");
            return;
        }

        let mut scheduler = self.scheduler();
        let policy = self.settings.on_interrupt;
        drive("edgetel-publisher", &mut scheduler, self, policy, interrupts).await;

        info!(stats = ?self.stats, "Publisher stopped");
    }

    /// Publish one heartbeat. Failures only show at debug level.
    pub async fn heartbeat_tick(&mut self) {
        match self
            .transport
            .publish_heartbeat(&self.settings.heartbeat_payload)
            .await
        {
            Ok(()) => {
                self.stats.heartbeats_sent += 1;
                debug!(topic = %self.transport.heartbeat_topic(), "Heartbeat sent");
            }
            Err(e) => {
                self.stats.heartbeat_failures += 1;
                debug!(error = %e, transient = e.is_transient(), "Heartbeat failed");
            }
        }
    }

    /// Read, mirror and publish one snapshot.
    pub async fn telemetry_tick(&mut self) {
        let timestamp = current_timestamp_secs();

        let snapshot = match self.settings.source.read_snapshot(timestamp).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.stats.ticks_skipped += 1;
                warn!(error = %e, "Skipping telemetry tick");
                return;
            }
        };

        debug!(fields = snapshot.len(), snapshot = ?snapshot.fields(), "Snapshot assembled");

        if let Some(path) = &self.settings.log_file
            && let Err(e) = mirror_snapshot(path, &snapshot).await
        {
            warn!(error = %e, "Failed to mirror snapshot");
        }

        match self.publish_snapshot(&snapshot).await {
            Ok(()) => {
                self.stats.snapshots_published += 1;
                debug!(topic = %self.settings.telemetry_topic, "Snapshot published");
            }
            Err(e) => {
                self.stats.publish_failures += 1;
                warn!(topic = %self.settings.telemetry_topic, error = %e, "Failed to publish snapshot");
            }
        }
    }

    async fn publish_snapshot(&self, snapshot: &TelemetrySnapshot) -> Result<()> {
        let envelope = self.transport.build_envelope(
            &self.settings.meta,
            TELEMETRY_PAYLOAD_TYPE,
            snapshot.to_json()?,
        );
        let payload = encode(&envelope, self.settings.format)?;
        self.transport
            .publish(&self.settings.telemetry_topic, payload)
            .await?;
        Ok(())
    }
}

impl<T: Transport> JobHandler<PublisherJob> for TelemetryPublisher<T> {
    async fn run_job(&mut self, job: PublisherJob) {
        match job {
            PublisherJob::Heartbeat => self.heartbeat_tick().await,
            PublisherJob::Telemetry => self.telemetry_tick().await,
        }
    }
}
