use crate::application::errors::BusError;
use async_trait::async_trait;

/// One (topic, body) pair as carried by the message bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub body: String,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            body: body.into(),
        }
    }
}

/// BusTransport trait - abstraction for pubsub transport adapters.
///
/// The transport is treated as a reliable ordered delivery channel per
/// subscribed topic. Connection management and reconnection live behind the
/// implementation; a failure surfaces as [`BusError`] and ends the service
/// loop.
#[async_trait]
pub trait BusTransport: Send {
    /// Subscribe to a topic
    async fn subscribe(&mut self, topic: &str) -> Result<(), BusError>;

    /// Publish a body on a topic
    async fn publish(&mut self, topic: &str, body: &str) -> Result<(), BusError>;

    /// Wait for the next message on any subscribed topic
    async fn recv(&mut self) -> Result<BusMessage, BusError>;
}
