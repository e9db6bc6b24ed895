//! Pub/sub transport abstraction.
//!
//! Services depend on the [`Transport`] capability interface rather than on a
//! concrete client. Two adapters are provided:
//!
//! - [`MqttTransport`] talks to an MQTT broker through rumqttc.
//! - `ZenohTransport` publishes over a Zenoh session (`zenoh` feature, on by
//!   default).
//!
//! [`AnyTransport`] picks one of them at runtime from a [`TransportConfig`].

mod mqtt;
#[cfg(feature = "zenoh")]
mod zenoh_session;

use std::future::Future;
use std::sync::Arc;

use edgetel_common::{Envelope, EnvelopeMeta, TransportConfig, current_timestamp_secs};

use crate::error::Result;

pub use mqtt::MqttTransport;
#[cfg(feature = "zenoh")]
pub use zenoh_session::{ZenohTransport, topic_to_key_expr};

/// A message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Callback invoked for every inbound message matching a subscription.
pub type MessageHandler = Arc<dyn Fn(InboundMessage) + Send + Sync>;

/// Capability interface over a pub/sub client.
pub trait Transport: Send + Sync {
    /// Establish the connection. Must succeed before anything is scheduled.
    fn connect(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Publish a raw payload on a topic.
    fn publish(&self, topic: &str, payload: Vec<u8>) -> impl Future<Output = Result<()>> + Send;

    /// Register `handler` for messages whose topic matches `filter`.
    fn subscribe(
        &self,
        filter: &str,
        handler: MessageHandler,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Topic liveness heartbeats go to.
    fn heartbeat_topic(&self) -> &str;

    /// Topic the startup registration goes to.
    fn registration_topic(&self) -> &str;

    /// Publish a liveness heartbeat on the transport's heartbeat topic.
    fn publish_heartbeat(&self, payload: &str) -> impl Future<Output = Result<()>> + Send {
        let payload = payload.as_bytes().to_vec();
        async move { self.publish(self.heartbeat_topic(), payload).await }
    }

    /// Announce this service on the transport's registration topic.
    fn publish_registration(&self, payload: &str) -> impl Future<Output = Result<()>> + Send {
        let payload = payload.as_bytes().to_vec();
        async move { self.publish(self.registration_topic(), payload).await }
    }

    /// Build an envelope stamped with the current push time.
    fn build_envelope(
        &self,
        meta: &EnvelopeMeta,
        payload_type: &str,
        payload: String,
    ) -> Envelope {
        Envelope::new(meta, current_timestamp_secs(), payload_type, payload)
    }
}

/// A transport chosen at runtime.
pub enum AnyTransport {
    Mqtt(MqttTransport),
    #[cfg(feature = "zenoh")]
    Zenoh(ZenohTransport),
}

impl AnyTransport {
    /// Build the transport described by `config`.
    ///
    /// `device_id` seeds the MQTT client id when none is configured.
    pub fn from_config(config: &TransportConfig, device_id: &str) -> Result<Self> {
        match config {
            TransportConfig::Mqtt(mqtt) => Ok(Self::Mqtt(MqttTransport::new(mqtt, device_id)?)),
            #[cfg(feature = "zenoh")]
            TransportConfig::Zenoh(zenoh) => Ok(Self::Zenoh(ZenohTransport::new(zenoh.clone()))),
            #[cfg(not(feature = "zenoh"))]
            TransportConfig::Zenoh(_) => Err(crate::error::BridgeError::Config(
                "zenoh transport requested but this build has no zenoh support".to_string(),
            )),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mqtt(_) => "mqtt",
            #[cfg(feature = "zenoh")]
            Self::Zenoh(_) => "zenoh",
        }
    }
}

impl Transport for AnyTransport {
    async fn connect(&mut self) -> Result<()> {
        match self {
            Self::Mqtt(t) => t.connect().await,
            #[cfg(feature = "zenoh")]
            Self::Zenoh(t) => t.connect().await,
        }
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        match self {
            Self::Mqtt(t) => t.publish(topic, payload).await,
            #[cfg(feature = "zenoh")]
            Self::Zenoh(t) => t.publish(topic, payload).await,
        }
    }

    async fn subscribe(&self, filter: &str, handler: MessageHandler) -> Result<()> {
        match self {
            Self::Mqtt(t) => t.subscribe(filter, handler).await,
            #[cfg(feature = "zenoh")]
            Self::Zenoh(t) => t.subscribe(filter, handler).await,
        }
    }

    fn heartbeat_topic(&self) -> &str {
        match self {
            Self::Mqtt(t) => t.heartbeat_topic(),
            #[cfg(feature = "zenoh")]
            Self::Zenoh(t) => t.heartbeat_topic(),
        }
    }

    fn registration_topic(&self) -> &str {
        match self {
            Self::Mqtt(t) => t.registration_topic(),
            #[cfg(feature = "zenoh")]
            Self::Zenoh(t) => t.registration_topic(),
        }
    }
}

/// Check whether an MQTT topic matches a subscription filter.
///
/// `+` matches exactly one level; a trailing `#` matches the parent level and
/// everything below it. Topics starting with `$` never match a filter that
/// starts with a wildcard.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    if topic.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }

    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return filter_levels.next().is_none(),
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
