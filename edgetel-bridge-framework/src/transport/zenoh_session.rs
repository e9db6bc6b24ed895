//! Zenoh transport.
//!
//! MQTT-style topics are mapped onto Zenoh key expressions: the leading and
//! trailing `/` are dropped, `+` becomes `*` and `#` becomes `**`.

use std::sync::Arc;

use tracing::{debug, info, warn};
use zenoh::Session;

use edgetel_common::ZenohConfig;

use super::{InboundMessage, MessageHandler, Transport};
use crate::error::{BridgeError, Result};

/// [`Transport`] backed by a Zenoh session.
pub struct ZenohTransport {
    config: ZenohConfig,
    session: Option<Arc<Session>>,
}

impl ZenohTransport {
    pub fn new(config: ZenohConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    fn session(&self) -> Result<&Arc<Session>> {
        self.session.as_ref().ok_or(BridgeError::NotConnected)
    }
}

impl Transport for ZenohTransport {
    async fn connect(&mut self) -> Result<()> {
        let session = open_session(&self.config).await?;
        self.session = Some(Arc::new(session));
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let session = self.session()?;
        let key = topic_to_key_expr(topic);

        session
            .put(&key, payload)
            .await
            .map_err(|e| BridgeError::publish(key.clone(), e))
    }

    async fn subscribe(&self, filter: &str, handler: MessageHandler) -> Result<()> {
        let session = self.session()?;
        let key_expr = topic_to_key_expr(filter);

        let subscriber = session
            .declare_subscriber(&key_expr)
            .await
            .map_err(|e| BridgeError::subscribe(key_expr.clone(), e))?;

        debug!(key = %key_expr, "Declared Zenoh subscriber");

        tokio::spawn(async move {
            loop {
                match subscriber.recv_async().await {
                    Ok(sample) => handler(InboundMessage {
                        topic: sample.key_expr().to_string(),
                        payload: sample.payload().to_bytes().to_vec(),
                    }),
                    Err(e) => {
                        warn!(error = %e, "Zenoh subscriber closed");
                        return;
                    }
                }
            }
        });

        Ok(())
    }

    fn heartbeat_topic(&self) -> &str {
        &self.config.heartbeat_key
    }

    fn registration_topic(&self) -> &str {
        &self.config.registration_key
    }
}

/// Map an MQTT-style topic or filter onto a Zenoh key expression.
pub fn topic_to_key_expr(topic: &str) -> String {
    topic
        .trim_matches('/')
        .split('/')
        .map(|level| match level {
            "+" => "*",
            "#" => "**",
            other => other,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Open a Zenoh session using the provided configuration.
async fn open_session(config: &ZenohConfig) -> Result<Session> {
    let mut zenoh_config = zenoh::Config::default();

    // Set mode
    let mode_str = match config.mode.as_str() {
        "client" | "peer" | "router" => format!("\"{}\"", config.mode),
        other => {
            return Err(BridgeError::config(format!(
                "Invalid Zenoh mode: '{}'. Expected 'client', 'peer', or 'router'",
                other
            )));
        }
    };

    zenoh_config
        .insert_json5("mode", &mode_str)
        .map_err(|e| BridgeError::config(format!("Failed to set mode: {}", e)))?;

    if !config.connect.is_empty() {
        let endpoints_json = serde_json::to_string(&config.connect)?;
        zenoh_config
            .insert_json5("connect/endpoints", &endpoints_json)
            .map_err(|e| BridgeError::config(format!("Failed to set connect endpoints: {}", e)))?;
    }

    if !config.listen.is_empty() {
        let endpoints_json = serde_json::to_string(&config.listen)?;
        zenoh_config
            .insert_json5("listen/endpoints", &endpoints_json)
            .map_err(|e| BridgeError::config(format!("Failed to set listen endpoints: {}", e)))?;
    }

    info!(
        mode = %config.mode,
        connect = ?config.connect,
        listen = ?config.listen,
        "Connecting to Zenoh"
    );

    let session = zenoh::open(zenoh_config).await?;

    info!(zid = %session.zid(), "Connected to Zenoh");

    Ok(session)
}
