//! Edge-device telemetry publisher.
//!
//! Publishes file-sourced device readings and a liveness heartbeat to an
//! MQTT broker (or a Zenoh network) on fixed schedules.

use anyhow::Result;
use clap::Parser;
use edgetel_bridge_framework::{AnyTransport, BridgeConfig, listen_for_interrupts};
use edgetel_common::init_tracing;

use edgetel_publisher::{PublisherArgs, PublisherConfig, TelemetryPublisher};

#[tokio::main]
async fn main() -> Result<()> {
    let args = PublisherArgs::parse();

    let config = PublisherConfig::resolve(&args).map_err(|e| anyhow::anyhow!("{}", e))?;

    init_tracing(config.logging()).map_err(|e| anyhow::anyhow!("{}", e))?;

    let device_id = config.device_id();
    let settings = config.settings(&device_id);

    let transport = AnyTransport::from_config(config.transport(), &device_id)
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    tracing::info!(
        device = %device_id,
        transport = transport.kind(),
        topic = %settings.telemetry_topic,
        telemetry_interval_secs = settings.telemetry_interval.as_secs(),
        heartbeat_interval_secs = settings.heartbeat_interval.as_secs(),
        fields = ?settings.source.field_count(),
        encoding = settings.format.mime_type(),
        "Telemetry publisher starting"
    );

    let mut publisher = TelemetryPublisher::new(transport, settings);

    if let Err(e) = publisher.start().await {
        tracing::error!(error = %e, "Failed to connect");
        return Err(anyhow::anyhow!("{}", e));
    }

    let mut interrupts = listen_for_interrupts();
    publisher.run(&mut interrupts).await;

    Ok(())
}
