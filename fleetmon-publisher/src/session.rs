//! Broker session: connection, topology declaration and publishing.

use async_trait::async_trait;
use lapin::options::{
    BasicPublishOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::uri::{AMQPAuthority, AMQPUri, AMQPUserInfo};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use fleetmon_common::{BrokerConfig, CONTENT_TYPE};

use crate::error::{PublisherError, Result};
use crate::topology::{DeclaredTopologies, Topology};

/// AMQP reply code for a normal close.
const REPLY_SUCCESS: u16 = 200;

/// A live connection to the message broker.
///
/// The publish loop only talks to the broker through this trait, so tests
/// can drive it with an in-memory double.
#[async_trait]
pub trait BrokerSession: Send + Sync {
    /// Declare exchange, queue and binding. Repeating an identical
    /// declaration must succeed without creating anything new.
    async fn declare_topology(&self, topology: &Topology) -> Result<()>;

    /// Send `payload` to the declared exchange under `routing_key`.
    ///
    /// Fire-and-forget: no confirm is awaited and nothing is retried.
    async fn publish(&self, routing_key: &str, payload: &[u8]) -> Result<()>;

    /// Close channel and connection. Calling it again is a no-op.
    async fn close(&self) -> Result<()>;
}

struct SessionInner {
    connection: Connection,
    channel: Channel,
    exchange: Option<String>,
    declared: DeclaredTopologies,
}

/// [`BrokerSession`] backed by a `lapin` AMQP 0-9-1 connection.
///
/// Owns exactly one connection and one channel. Publishing and closing are
/// serialized on an internal lock, so `close` waits for an in-flight publish
/// instead of tearing the channel down under it.
pub struct AmqpSession {
    endpoint: String,
    inner: Mutex<Option<SessionInner>>,
}

impl AmqpSession {
    /// Connect to the broker and open a channel.
    ///
    /// No retry: an unreachable broker or rejected login is returned as
    /// [`PublisherError::Connection`].
    pub async fn connect(config: &BrokerConfig) -> Result<Self> {
        let endpoint = config.endpoint();

        info!(endpoint = %endpoint, vhost = %config.vhost, "Connecting to broker");

        let properties = ConnectionProperties::default()
            .with_connection_name(env!("CARGO_PKG_NAME").into());

        let connection = Connection::connect_uri(amqp_uri(config), properties)
            .await
            .map_err(|e| PublisherError::Connection(format!("{}: {}", endpoint, e)))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| PublisherError::Connection(format!("failed to open channel: {}", e)))?;

        info!(endpoint = %endpoint, channel = channel.id(), "Connected to broker");

        Ok(Self {
            endpoint,
            inner: Mutex::new(Some(SessionInner {
                connection,
                channel,
                exchange: None,
                declared: DeclaredTopologies::new(),
            })),
        })
    }

    /// Broker `host:port`.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether the underlying connection is still up.
    pub async fn is_connected(&self) -> bool {
        match self.inner.lock().await.as_ref() {
            Some(inner) => inner.connection.status().connected(),
            None => false,
        }
    }
}

#[async_trait]
impl BrokerSession for AmqpSession {
    async fn declare_topology(&self, topology: &Topology) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let inner = guard
            .as_mut()
            .ok_or_else(|| PublisherError::ConnectionLost("session closed".to_string()))?;

        if !inner.declared.needs_declare(topology) {
            debug!(exchange = %topology.exchange, queue = %topology.queue, "Topology already declared");
            inner.exchange = Some(topology.exchange.clone());
            return Ok(());
        }

        inner
            .channel
            .exchange_declare(
                &topology.exchange,
                ExchangeKind::Direct,
                ExchangeDeclareOptions {
                    durable: topology.durable,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| PublisherError::topology(format!("exchange '{}'", topology.exchange), e))?;

        inner
            .channel
            .queue_declare(
                &topology.queue,
                QueueDeclareOptions {
                    durable: topology.durable,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| PublisherError::topology(format!("queue '{}'", topology.queue), e))?;

        inner
            .channel
            .queue_bind(
                &topology.queue,
                &topology.exchange,
                &topology.routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                PublisherError::topology(
                    format!(
                        "binding '{}' -> '{}' ({})",
                        topology.queue, topology.exchange, topology.routing_key
                    ),
                    e,
                )
            })?;

        inner.declared.record(topology);
        inner.exchange = Some(topology.exchange.clone());

        info!(
            exchange = %topology.exchange,
            queue = %topology.queue,
            routing_key = %topology.routing_key,
            durable = topology.durable,
            "Topology declared"
        );

        Ok(())
    }

    async fn publish(&self, routing_key: &str, payload: &[u8]) -> Result<()> {
        let guard = self.inner.lock().await;
        let inner = guard
            .as_ref()
            .ok_or_else(|| PublisherError::ConnectionLost("session closed".to_string()))?;

        let exchange = inner.exchange.as_deref().ok_or_else(|| PublisherError::Publish {
            routing_key: routing_key.to_string(),
            message: "no topology declared".to_string(),
        })?;

        let result = inner
            .channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default().with_content_type(CONTENT_TYPE.into()),
            )
            .await;

        // The returned confirm is dropped: the channel is not in confirm mode.
        match result {
            Ok(_confirm) => Ok(()),
            Err(e) => Err(publish_error(
                routing_key,
                e.to_string(),
                inner.channel.status().connected(),
                inner.connection.status().connected(),
            )),
        }
    }

    async fn close(&self) -> Result<()> {
        let Some(inner) = self.inner.lock().await.take() else {
            debug!(endpoint = %self.endpoint, "Broker session already closed");
            return Ok(());
        };

        if inner.channel.status().connected() {
            if let Err(e) = inner.channel.close(REPLY_SUCCESS, "shutting down").await {
                warn!(error = %e, "Error closing broker channel");
            }
        }

        if inner.connection.status().connected() {
            inner
                .connection
                .close(REPLY_SUCCESS, "shutting down")
                .await
                .map_err(|e| PublisherError::Connection(format!("close failed: {}", e)))?;
        }

        info!(endpoint = %self.endpoint, "Broker session closed");

        Ok(())
    }
}

/// Classify a failed publish.
///
/// The session never reopens its channel, so a channel closed by the broker
/// is as final as a dropped connection.
fn publish_error(
    routing_key: &str,
    message: String,
    channel_up: bool,
    connection_up: bool,
) -> PublisherError {
    if channel_up && connection_up {
        PublisherError::Publish {
            routing_key: routing_key.to_string(),
            message,
        }
    } else {
        PublisherError::ConnectionLost(message)
    }
}

/// Build the connection URI from discrete settings, so credentials never go
/// through URL parsing.
fn amqp_uri(config: &BrokerConfig) -> AMQPUri {
    AMQPUri {
        authority: AMQPAuthority {
            userinfo: AMQPUserInfo {
                username: config.username.clone(),
                password: config.password.clone(),
            },
            host: config.host.clone(),
            port: config.port,
        },
        vhost: config.vhost.clone(),
        ..AMQPUri::default()
    }
}
