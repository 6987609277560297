//! Publish/subscribe dispatcher.
//!
//! Publishing resolves descriptor, topic and partition key from the typed
//! event, wraps integration events and hands the result to the transport.
//! Receiving decodes the wire type (envelope `type` or transport metadata),
//! deserializes and invokes the handler registered for that type. The
//! dispatcher never retries; that belongs to the transport.

use std::collections::{BTreeSet, HashMap};
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::envelope::{CloudEventEnvelope, ENVELOPE_CONTENT_TYPE, EnvelopeWrapper, OutgoingMessage};
use crate::error::MessagingError;
use crate::event::Event;
use crate::partition_key::{PartitionKey, resolve_partition_key};
use crate::registry::EventRegistry;
use crate::transport::{InboundHandler, InboundMessage, Transport, TransportScope};

/// Error returned by event handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Handles received events of type `E`.
#[async_trait]
pub trait EventHandler<E: Event>: Send + Sync + 'static {
    /// Handles one event.
    async fn handle(&self, event: E) -> Result<(), HandlerError>;
}

/// Result of dispatching one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The registered handler succeeded.
    Handled,
    /// No handler is registered for the message's type; dropped.
    Unhandled,
    /// The message could not be decoded; skipped.
    Poison,
    /// The handler returned an error.
    HandlerFailed,
    /// Handling was cancelled before the handler finished.
    Cancelled,
}

impl DispatchOutcome {
    /// Returns true if the transport should acknowledge the message.
    ///
    /// Poison and unhandled messages are acknowledged: redelivery cannot
    /// change their outcome.
    #[must_use]
    pub fn should_ack(&self) -> bool {
        matches!(self, Self::Handled | Self::Unhandled | Self::Poison)
    }

    /// Returns true if the handler ran and succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Handled)
    }
}

/// What the transport accepted for a published event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Wire type name.
    pub event_type: &'static str,
    /// Destination topic.
    pub topic: String,
    /// Partition key sent with the message.
    pub partition_key: Option<PartitionKey>,
    /// Envelope id, for wrapped integration events.
    pub envelope_id: Option<String>,
}

enum InvocationError {
    Deserialize(serde_json::Error),
    Handler(HandlerError),
}

#[async_trait]
trait ErasedHandler: Send + Sync {
    async fn invoke(&self, data: serde_json::Value) -> Result<(), InvocationError>;
}

struct TypedHandler<E, H> {
    handler: H,
    _event: PhantomData<fn() -> E>,
}

#[async_trait]
impl<E, H> ErasedHandler for TypedHandler<E, H>
where
    E: Event,
    H: EventHandler<E>,
{
    async fn invoke(&self, data: serde_json::Value) -> Result<(), InvocationError> {
        let event: E = serde_json::from_value(data).map_err(InvocationError::Deserialize)?;
        self.handler
            .handle(event)
            .await
            .map_err(InvocationError::Handler)
    }
}

struct HandlerEntry {
    topic: String,
    handler: Arc<dyn ErasedHandler>,
}

struct Inner {
    registry: Arc<EventRegistry>,
    transport: Arc<dyn Transport>,
    wrapper: EnvelopeWrapper,
    handlers: RwLock<HashMap<&'static str, HandlerEntry>>,
}

/// Routes outgoing events to the transport and inbound messages to handlers.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("source", &self.inner.wrapper.source())
            .field("scope", &self.inner.transport.scope())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher over `transport`.
    #[must_use]
    pub fn new(
        registry: Arc<EventRegistry>,
        transport: Arc<dyn Transport>,
        wrapper: EnvelopeWrapper,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                transport,
                wrapper,
                handlers: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// The registry descriptors are resolved from.
    #[must_use]
    pub fn registry(&self) -> &Arc<EventRegistry> {
        &self.inner.registry
    }

    /// Scope of the underlying transport.
    #[must_use]
    pub fn transport_scope(&self) -> TransportScope {
        self.inner.transport.scope()
    }

    /// Publishes `event` to its topic.
    ///
    /// Returns once the transport has accepted the message.
    ///
    /// # Errors
    ///
    /// - `MessagingError::Declaration` if the event's declaration is malformed.
    /// - `MessagingError::InternalEventOnExternalTransport` if an internal
    ///   event targets an external transport.
    /// - `MessagingError::PartitionKey` if the key cannot be computed.
    /// - `MessagingError::Transport` with the transport's error, unmodified.
    /// - `MessagingError::Cancelled` if `cancel` fires before the send completes.
    #[instrument(name = "messaging.publish", skip_all, fields(event_type = %E::EVENT_TYPE))]
    pub async fn publish<E: Event>(
        &self,
        event: &E,
        cancel: &CancellationToken,
    ) -> Result<PublishReceipt, MessagingError> {
        if cancel.is_cancelled() {
            return Err(MessagingError::Cancelled);
        }

        let descriptor = self.inner.registry.describe::<E>()?;

        if descriptor.is_internal() && self.inner.transport.scope() == TransportScope::External {
            warn!(
                topic = %descriptor.topic(),
                "Refusing to publish internal event to external transport"
            );
            return Err(MessagingError::InternalEventOnExternalTransport {
                event_type: E::EVENT_TYPE.to_owned(),
                topic: descriptor.topic().to_owned(),
            });
        }

        let partition_key = resolve_partition_key(event, &descriptor)?;
        if partition_key.is_none() {
            debug!(
                topic = %descriptor.topic(),
                "No partition key declared, using broker default partitioning"
            );
        }

        let payload = serde_json::to_value(event).map_err(|e| MessagingError::Serialization {
            event_type: E::EVENT_TYPE.to_owned(),
            cause: e.to_string(),
        })?;

        let mut message = self
            .inner
            .wrapper
            .apply(OutgoingMessage::new(&descriptor, partition_key, payload));
        let transport_message =
            message
                .to_transport()
                .map_err(|e| MessagingError::Serialization {
                    event_type: E::EVENT_TYPE.to_owned(),
                    cause: e.to_string(),
                })?;

        debug!(
            topic = %message.topic(),
            partition_key = ?message.partition_key().map(PartitionKey::as_str),
            content_type = %message.content_type(),
            payload_size = transport_message.payload.len(),
            "Publishing event"
        );

        let sent = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(MessagingError::Cancelled),
            result = self.inner.transport.send(transport_message) => result.map_err(MessagingError::from),
        };
        sent?;
        message.mark_sent();

        Ok(PublishReceipt {
            event_type: E::EVENT_TYPE,
            topic: message.topic().to_owned(),
            partition_key: message.partition_key().cloned(),
            envelope_id: message.envelope().map(|envelope| envelope.id.clone()),
        })
    }

    /// Registers `handler` for received events of type `E`. A later
    /// registration for the same type replaces the earlier one.
    ///
    /// # Errors
    ///
    /// Returns `MessagingError::Declaration` if `E`'s declaration is malformed.
    pub fn on<E, H>(&self, handler: H) -> Result<(), MessagingError>
    where
        E: Event,
        H: EventHandler<E>,
    {
        let descriptor = self.inner.registry.describe::<E>()?;
        let entry = HandlerEntry {
            topic: descriptor.topic().to_owned(),
            handler: Arc::new(TypedHandler {
                handler,
                _event: PhantomData,
            }),
        };

        let replaced = self
            .inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(E::EVENT_TYPE, entry)
            .is_some();
        if replaced {
            warn!(event_type = %E::EVENT_TYPE, "Replacing previously registered handler");
        }

        info!(
            event_type = %E::EVENT_TYPE,
            topic = %descriptor.topic(),
            "Event handler registered"
        );
        Ok(())
    }

    /// Topics with at least one registered handler, sorted.
    #[must_use]
    pub fn handled_topics(&self) -> Vec<String> {
        let topics: BTreeSet<String> = self
            .inner
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|entry| entry.topic.clone())
            .collect();
        topics.into_iter().collect()
    }

    /// Subscribes this dispatcher to every topic with a registered handler.
    /// Messages received through the subscription are dispatched with
    /// `cancel` as their cancellation signal.
    ///
    /// # Errors
    ///
    /// Returns `MessagingError::Transport` if a subscription fails and
    /// `MessagingError::Cancelled` if `cancel` has fired.
    pub async fn subscribe(&self, cancel: &CancellationToken) -> Result<Vec<String>, MessagingError> {
        let topics = self.handled_topics();
        let subscription: Arc<dyn InboundHandler> = Arc::new(Subscription {
            dispatcher: self.clone(),
            cancel: cancel.clone(),
        });

        for topic in &topics {
            if cancel.is_cancelled() {
                return Err(MessagingError::Cancelled);
            }
            self.inner
                .transport
                .subscribe(topic, Arc::clone(&subscription))
                .await?;
            info!(topic = %topic, "Subscribed to topic");
        }

        Ok(topics)
    }

    /// Dispatches one inbound message to its handler.
    #[instrument(name = "messaging.dispatch", skip_all, fields(topic = %message.topic))]
    pub async fn dispatch(&self, message: InboundMessage, cancel: &CancellationToken) -> DispatchOutcome {
        let Some((event_type, data)) = decode(&message) else {
            return DispatchOutcome::Poison;
        };

        let registered = self
            .inner
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_type.as_str())
            .map(|entry| (entry.topic.clone(), Arc::clone(&entry.handler)));
        let Some((expected_topic, handler)) = registered else {
            warn!(event_type = %event_type, "No handler registered for event type, dropping message");
            return DispatchOutcome::Unhandled;
        };
        if expected_topic != message.topic {
            warn!(
                event_type = %event_type,
                expected_topic = %expected_topic,
                "Event type arrived on a topic its handler does not consume, dropping message"
            );
            return DispatchOutcome::Unhandled;
        }

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = handler.invoke(data) => Some(result),
        };

        match result {
            None => {
                warn!(event_type = %event_type, "Event handling cancelled");
                DispatchOutcome::Cancelled
            }
            Some(Ok(())) => {
                debug!(event_type = %event_type, "Event handled");
                DispatchOutcome::Handled
            }
            Some(Err(InvocationError::Deserialize(e))) => {
                error!(event_type = %event_type, error = %e, "Failed to deserialize event, skipping poison message");
                DispatchOutcome::Poison
            }
            Some(Err(InvocationError::Handler(e))) => {
                error!(event_type = %event_type, error = %e, "Event handler failed");
                DispatchOutcome::HandlerFailed
            }
        }
    }
}

/// Extracts the wire type and JSON data of an inbound message.
///
/// A body is read as an envelope when the transport says so or when it has
/// the envelope's shape; otherwise the wire type comes from the transport
/// metadata.
fn decode(message: &InboundMessage) -> Option<(String, serde_json::Value)> {
    let body: serde_json::Value = match serde_json::from_slice(&message.payload) {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, content_type = %message.metadata.content_type, "Failed to parse message body, skipping poison message");
            return None;
        }
    };

    if message.metadata.content_type == ENVELOPE_CONTENT_TYPE
        || CloudEventEnvelope::is_envelope_shaped(&body)
    {
        return match CloudEventEnvelope::from_value(body) {
            Ok(envelope) => Some((envelope.event_type, envelope.data)),
            Err(e) => {
                error!(error = %e, "Failed to decode envelope, skipping poison message");
                None
            }
        };
    }

    let Some(event_type) = message.metadata.event_type.clone() else {
        error!("Raw message carries no event type, skipping poison message");
        return None;
    };
    Some((event_type, body))
}

struct Subscription {
    dispatcher: Dispatcher,
    cancel: CancellationToken,
}

#[async_trait]
impl InboundHandler for Subscription {
    async fn on_message(&self, message: InboundMessage) -> DispatchOutcome {
        self.dispatcher.dispatch(message, &self.cancel).await
    }
}
