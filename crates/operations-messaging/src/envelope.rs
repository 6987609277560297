//! Cloud-event envelope and the outgoing message state machine.
//!
//! Every outgoing message moves through
//! `Created -> Classified -> [Wrapped] -> Sent`. Integration events are
//! wrapped in a [`CloudEventEnvelope`]; everything else is sent raw.
//! Topic and partition key are fixed when the message is created from the
//! typed event, so wrapping never hides what routing needs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use operations_core::clock::Clock;
use operations_core::ids::IdGenerator;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptor::{EventDescriptor, MessageClass};
use crate::error::EnvelopeError;
use crate::partition_key::PartitionKey;
use crate::transport::TransportMessage;

/// CloudEvents specification version written to every envelope.
pub const CLOUDEVENTS_SPEC_VERSION: &str = "1.0";

/// Content type of a message whose body is a structured cloud event.
pub const ENVELOPE_CONTENT_TYPE: &str = "application/cloudevents+json";

/// Content type of raw JSON bodies and of the envelope's `data`.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Standard envelope wrapping an integration event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudEventEnvelope {
    /// CloudEvents specification version. Producers that omit it are read
    /// as `1.0`.
    #[serde(default = "default_specversion")]
    pub specversion: String,
    /// Unique, time-ordered envelope identifier.
    pub id: String,
    /// Wire type name of the wrapped event.
    #[serde(rename = "type")]
    pub event_type: String,
    /// URN of the producing service.
    pub source: String,
    /// UTC instant the event was wrapped.
    pub time: DateTime<Utc>,
    /// Media type of `data`.
    pub datacontenttype: String,
    /// The event payload as structured JSON.
    pub data: serde_json::Value,
}

impl CloudEventEnvelope {
    /// Parses and validates an envelope received from a transport.
    ///
    /// # Errors
    ///
    /// Returns `EnvelopeError::Malformed` if the bytes are not an envelope
    /// and `EnvelopeError::Invalid` if a required attribute is missing.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let envelope: Self = serde_json::from_slice(bytes)?;
        envelope.validate()?;
        Ok(envelope)
    }

    /// Converts and validates an already parsed JSON body.
    ///
    /// # Errors
    ///
    /// Same as [`CloudEventEnvelope::from_slice`].
    pub fn from_value(value: serde_json::Value) -> Result<Self, EnvelopeError> {
        let envelope: Self = serde_json::from_value(value)?;
        envelope.validate()?;
        Ok(envelope)
    }

    /// Whether `body` carries the envelope attributes `id`, `type`,
    /// `source` and `data`, whatever content type it arrived under.
    #[must_use]
    pub fn is_envelope_shaped(body: &serde_json::Value) -> bool {
        body.as_object().is_some_and(|attributes| {
            ["id", "type", "source"]
                .iter()
                .all(|name| attributes.get(*name).is_some_and(serde_json::Value::is_string))
                && attributes.contains_key("data")
        })
    }

    /// Serializes the envelope to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if `data` cannot be encoded.
    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    fn validate(&self) -> Result<(), EnvelopeError> {
        if self.specversion != CLOUDEVENTS_SPEC_VERSION {
            return Err(EnvelopeError::Invalid {
                reason: format!("unsupported specversion '{}'", self.specversion),
            });
        }
        for (attribute, value) in [
            ("id", &self.id),
            ("type", &self.event_type),
            ("source", &self.source),
        ] {
            if value.trim().is_empty() {
                return Err(EnvelopeError::Invalid {
                    reason: format!("{attribute} is empty"),
                });
            }
        }
        Ok(())
    }
}

fn default_specversion() -> String {
    CLOUDEVENTS_SPEC_VERSION.to_owned()
}

/// Where an outgoing message is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStage {
    /// Built from a typed event.
    Created,
    /// Classified as integration or non-integration.
    Classified(MessageClass),
    /// Wrapped in an envelope. Never wrapped again.
    Wrapped,
    /// Accepted by the transport.
    Sent,
}

/// The body of an outgoing message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    /// The event's own JSON form.
    Raw(serde_json::Value),
    /// The event inside a cloud-event envelope.
    Enveloped(CloudEventEnvelope),
}

/// A message on its way to the transport.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    event_type: &'static str,
    topic: String,
    partition_key: Option<PartitionKey>,
    class: MessageClass,
    content_type: &'static str,
    body: MessageBody,
    stage: MessageStage,
}

impl OutgoingMessage {
    /// Creates a message for an event described by `descriptor`.
    #[must_use]
    pub fn new(
        descriptor: &EventDescriptor,
        partition_key: Option<PartitionKey>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_type: descriptor.event_type(),
            topic: descriptor.topic().to_owned(),
            partition_key,
            class: descriptor.class(),
            content_type: JSON_CONTENT_TYPE,
            body: MessageBody::Raw(payload),
            stage: MessageStage::Created,
        }
    }

    /// Moves a freshly created message to `Classified`. Later stages are kept.
    #[must_use]
    pub fn classify(mut self) -> Self {
        if self.stage == MessageStage::Created {
            self.stage = MessageStage::Classified(self.class);
        }
        self
    }

    /// Records that the transport accepted the message.
    pub fn mark_sent(&mut self) {
        self.stage = MessageStage::Sent;
    }

    /// Wire type name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        self.event_type
    }

    /// Destination topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Resolved partition key, if any.
    #[must_use]
    pub fn partition_key(&self) -> Option<&PartitionKey> {
        self.partition_key.as_ref()
    }

    /// Current content type.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    /// Current body.
    #[must_use]
    pub fn body(&self) -> &MessageBody {
        &self.body
    }

    /// Current lifecycle stage.
    #[must_use]
    pub fn stage(&self) -> MessageStage {
        self.stage
    }

    /// The envelope, once wrapped.
    #[must_use]
    pub fn envelope(&self) -> Option<&CloudEventEnvelope> {
        match &self.body {
            MessageBody::Enveloped(envelope) => Some(envelope),
            MessageBody::Raw(_) => None,
        }
    }

    /// Serializes the message for the transport.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if the body cannot be encoded.
    pub fn to_transport(&self) -> Result<TransportMessage, serde_json::Error> {
        let payload = match &self.body {
            MessageBody::Raw(value) => serde_json::to_vec(value)?,
            MessageBody::Enveloped(envelope) => envelope.to_vec()?,
        };
        Ok(TransportMessage {
            topic: self.topic.clone(),
            partition_key: self.partition_key.as_ref().map(|k| k.as_str().to_owned()),
            payload,
            content_type: self.content_type.to_owned(),
            event_type: self.event_type.to_owned(),
        })
    }
}

/// Wraps outgoing integration events in cloud-event envelopes.
#[derive(Clone)]
pub struct EnvelopeWrapper {
    source: String,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl std::fmt::Debug for EnvelopeWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeWrapper")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl EnvelopeWrapper {
    /// Creates a wrapper stamping envelopes with `source`.
    #[must_use]
    pub fn new(source: impl Into<String>, clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            source: source.into(),
            clock,
            ids,
        }
    }

    /// The producing service's URN.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Classifies `message` and wraps it if it is an integration event.
    /// Messages already wrapped or sent are returned unchanged.
    #[must_use]
    pub fn apply(&self, message: OutgoingMessage) -> OutgoingMessage {
        if matches!(message.stage, MessageStage::Wrapped | MessageStage::Sent) {
            debug!(
                event_type = %message.event_type,
                stage = ?message.stage,
                "Message already past wrapping, leaving as is"
            );
            return message;
        }

        let mut message = message.classify();
        if message.class != MessageClass::Integration {
            return message;
        }

        if let MessageBody::Raw(data) = &mut message.body {
            let data = std::mem::take(data);
            message.body = MessageBody::Enveloped(CloudEventEnvelope {
                specversion: CLOUDEVENTS_SPEC_VERSION.to_owned(),
                id: self.ids.next_id().to_string(),
                event_type: message.event_type.to_owned(),
                source: self.source.clone(),
                time: self.clock.now(),
                datacontenttype: JSON_CONTENT_TYPE.to_owned(),
                data,
            });
            message.content_type = ENVELOPE_CONTENT_TYPE;
        }
        message.stage = MessageStage::Wrapped;
        message
    }
}
