//! Transport boundary: the broker client the dispatcher hands messages to.
//!
//! Connection management, retries and consumer-group coordination belong
//! to the transport implementation, never to the dispatcher.

use std::sync::Arc;

use async_trait::async_trait;

use crate::dispatcher::DispatchOutcome;
use crate::error::TransportError;

/// Who can observe messages sent through a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportScope {
    /// Delivery stays inside the owning service.
    Internal,
    /// Delivery reaches other services through a shared broker.
    External,
}

/// A serialized message ready for the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportMessage {
    /// Destination topic.
    pub topic: String,
    /// Ordering key; `None` lets the broker choose a partition.
    pub partition_key: Option<String>,
    /// Serialized body (envelope or raw event).
    pub payload: Vec<u8>,
    /// Body media type.
    pub content_type: String,
    /// Wire type name, carried as transport metadata.
    pub event_type: String,
}

/// Transport metadata delivered alongside an inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageMetadata {
    /// Body media type.
    pub content_type: String,
    /// Wire type name, when the producer supplied one.
    pub event_type: Option<String>,
    /// Ordering key the message was sent with.
    pub partition_key: Option<String>,
    /// Partition the broker assigned.
    pub partition: Option<u32>,
}

/// A message received from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Topic the message arrived on.
    pub topic: String,
    /// Serialized body.
    pub payload: Vec<u8>,
    /// Transport metadata.
    pub metadata: MessageMetadata,
}

impl From<TransportMessage> for InboundMessage {
    fn from(message: TransportMessage) -> Self {
        Self {
            topic: message.topic,
            payload: message.payload,
            metadata: MessageMetadata {
                content_type: message.content_type,
                event_type: Some(message.event_type),
                partition_key: message.partition_key,
                partition: None,
            },
        }
    }
}

/// Receives messages delivered by a transport subscription.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    /// Processes one message; the outcome tells the transport whether to ack.
    async fn on_message(&self, message: InboundMessage) -> DispatchOutcome;
}

/// Broker client consumed by the dispatcher.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Whether messages leave the owning service.
    fn scope(&self) -> TransportScope;

    /// Hands a message to the broker. Returns once the broker client has
    /// accepted it.
    async fn send(&self, message: TransportMessage) -> Result<(), TransportError>;

    /// Delivers every message published to `topic` to `handler`.
    async fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn InboundHandler>,
    ) -> Result<(), TransportError>;
}
