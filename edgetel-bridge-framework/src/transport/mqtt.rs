//! MQTT transport over rumqttc.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, trace, warn};

use edgetel_common::MqttConfig;

use super::{InboundMessage, MessageHandler, Transport, topic_matches};
use crate::error::{BridgeError, Result};

/// Pause between event loop polls after a connection error.
const RECONNECT_PAUSE: Duration = Duration::from_secs(1);

/// Smallest keep-alive rumqttc accepts.
const MIN_KEEP_ALIVE_SECS: u64 = 5;

type Subscriptions = Arc<RwLock<Vec<(String, MessageHandler)>>>;

/// [`Transport`] backed by an MQTT broker connection.
///
/// The rumqttc event loop is polled inline until the broker acknowledges the
/// connection, then handed to a background task that keeps it running and
/// dispatches inbound publishes to registered handlers.
pub struct MqttTransport {
    client: AsyncClient,
    /// Present until `connect()` hands it to the driver task. The mutex only
    /// makes the transport `Sync`; it is never contended.
    event_loop: Mutex<Option<EventLoop>>,
    connected: bool,
    broker: String,
    qos: QoS,
    connect_timeout: Duration,
    heartbeat_topic: String,
    registration_topic: String,
    subscriptions: Subscriptions,
}

impl MqttTransport {
    /// Create a client for the configured broker without connecting.
    pub fn new(config: &MqttConfig, device_id: &str) -> Result<Self> {
        let qos = qos_from_level(config.qos)?;

        if config.keep_alive_secs < MIN_KEEP_ALIVE_SECS {
            return Err(BridgeError::validation(format!(
                "keep_alive_secs must be >= {}",
                MIN_KEEP_ALIVE_SECS
            )));
        }

        let client_id = client_id_for(config, device_id);
        let mut options = MqttOptions::new(client_id, config.host.clone(), config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(options, config.channel_capacity.max(1));

        Ok(Self {
            client,
            event_loop: Mutex::new(Some(event_loop)),
            connected: false,
            broker: format!("{}:{}", config.host, config.port),
            qos,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            heartbeat_topic: config.heartbeat_topic.clone(),
            registration_topic: config.registration_topic.clone(),
            subscriptions: Arc::new(RwLock::new(Vec::new())),
        })
    }

    /// Broker address as `host:port`.
    pub fn broker(&self) -> &str {
        &self.broker
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

impl Transport for MqttTransport {
    async fn connect(&mut self) -> Result<()> {
        let mut event_loop = self
            .event_loop
            .get_mut()
            .take()
            .ok_or_else(|| BridgeError::connection("MQTT transport already connected"))?;

        info!(broker = %self.broker, "Connecting to MQTT broker");

        let outcome =
            match tokio::time::timeout(self.connect_timeout, wait_for_connack(&mut event_loop))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(BridgeError::connection(format!(
                    "timed out after {}s waiting for CONNACK from {}",
                    self.connect_timeout.as_secs(),
                    self.broker
                ))),
            };

        if let Err(e) = outcome {
            *self.event_loop.get_mut() = Some(event_loop);
            return Err(e);
        }

        self.connected = true;

        info!(broker = %self.broker, "Connected to MQTT broker");

        tokio::spawn(drive_event_loop(
            event_loop,
            self.client.clone(),
            self.subscriptions.clone(),
            self.qos,
        ));

        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        if !self.is_connected() {
            return Err(BridgeError::NotConnected);
        }

        self.client
            .publish(topic, self.qos, false, payload)
            .await
            .map_err(|e| BridgeError::publish(topic, e))
    }

    async fn subscribe(&self, filter: &str, handler: MessageHandler) -> Result<()> {
        if !self.is_connected() {
            return Err(BridgeError::NotConnected);
        }

        self.subscriptions
            .write()
            .await
            .push((filter.to_string(), handler));

        self.client
            .subscribe(filter, self.qos)
            .await
            .map_err(|e| BridgeError::subscribe(filter, e))?;

        debug!(filter = %filter, "Subscribed to MQTT topic");
        Ok(())
    }

    fn heartbeat_topic(&self) -> &str {
        &self.heartbeat_topic
    }

    fn registration_topic(&self) -> &str {
        &self.registration_topic
    }
}

/// Poll the event loop until the broker accepts or rejects the connection.
async fn wait_for_connack(event_loop: &mut EventLoop) -> Result<()> {
    loop {
        match event_loop.poll().await? {
            Event::Incoming(Packet::ConnAck(ack)) => {
                if ack.code == ConnectReturnCode::Success {
                    return Ok(());
                }
                return Err(BridgeError::connection(format!(
                    "broker refused connection: {:?}",
                    ack.code
                )));
            }
            event => trace!(?event, "MQTT event before CONNACK"),
        }
    }
}

/// Keep the rumqttc event loop running for the life of the process.
///
/// rumqttc reconnects on the next poll after an error; subscriptions are
/// re-sent whenever a fresh CONNACK arrives.
async fn drive_event_loop(
    mut event_loop: EventLoop,
    client: AsyncClient,
    subscriptions: Subscriptions,
    qos: QoS,
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let message = InboundMessage {
                    topic: publish.topic.clone(),
                    payload: publish.payload.to_vec(),
                };

                let subscriptions = subscriptions.read().await;
                for (filter, handler) in subscriptions.iter() {
                    if topic_matches(filter, &message.topic) {
                        handler(message.clone());
                    }
                }
            }
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("Reconnected to MQTT broker");
                let subscriptions = subscriptions.read().await;
                for (filter, _) in subscriptions.iter() {
                    if let Err(e) = client.try_subscribe(filter.as_str(), qos) {
                        warn!(filter = %filter, error = %e, "Failed to resubscribe");
                    }
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                warn!("Disconnected by broker");
            }
            Ok(event) => trace!(?event, "MQTT event"),
            Err(e) => {
                warn!(error = %e, "MQTT connection error");
                tokio::time::sleep(RECONNECT_PAUSE).await;
            }
        }
    }
}

fn client_id_for(config: &MqttConfig, device_id: &str) -> String {
    match &config.client_id {
        Some(id) if !id.is_empty() => id.clone(),
        _ => format!("{}-telemetry", device_id),
    }
}

fn qos_from_level(level: u8) -> Result<QoS> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(BridgeError::validation(format!(
            "MQTT QoS must be 0, 1 or 2, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_transport<T: Transport>() {}

    #[test]
    fn test_satisfies_transport_bounds() {
        assert_transport::<MqttTransport>();
    }

    #[test]
    fn test_qos_levels() {
        assert_eq!(qos_from_level(0).unwrap(), QoS::AtMostOnce);
        assert_eq!(qos_from_level(1).unwrap(), QoS::AtLeastOnce);
        assert_eq!(qos_from_level(2).unwrap(), QoS::ExactlyOnce);
        assert!(qos_from_level(3).is_err());
    }

    #[test]
    fn test_client_id_defaults_to_device() {
        let config = MqttConfig::default();
        assert_eq!(client_id_for(&config, "pinephone01"), "pinephone01-telemetry");

        let config = MqttConfig {
            client_id: Some("custom".to_string()),
            ..MqttConfig::default()
        };
        assert_eq!(client_id_for(&config, "pinephone01"), "custom");
    }

    #[test]
    fn test_rejects_short_keep_alive() {
        let config = MqttConfig {
            keep_alive_secs: 1,
            ..MqttConfig::default()
        };
        assert!(matches!(
            MqttTransport::new(&config, "dev"),
            Err(BridgeError::ConfigValidation(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_before_connect() {
        let transport = MqttTransport::new(&MqttConfig::default(), "dev").unwrap();
        assert!(!transport.is_connected());

        let result = transport.publish("/telemetry", b"{}".to_vec()).await;
        assert!(matches!(result, Err(BridgeError::NotConnected)));
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported() {
        let config = MqttConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            connect_timeout_secs: 2,
            ..MqttConfig::default()
        };
        let mut transport = MqttTransport::new(&config, "dev").unwrap();

        assert!(transport.connect().await.is_err());
        assert!(!transport.is_connected());
    }
}
