//! Messaging error types.

use operations_core::error::DomainError;
use thiserror::Error;

/// A malformed event declaration. Raised the first time the event type is
/// described and never degraded into a default topic or key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    /// The event type declares an empty wire type name.
    #[error("event type {type_name} declares an empty wire type name")]
    EmptyEventType {
        /// Rust type name of the offending event.
        type_name: &'static str,
    },

    /// The topic (literal or resolved from an entity) is empty.
    #[error("event type {event_type} resolves to an empty topic")]
    EmptyTopic {
        /// Wire type name of the offending event.
        event_type: &'static str,
    },

    /// The topic contains characters outside `[a-z0-9._-]`.
    #[error("event type {event_type} resolves to invalid topic '{topic}'")]
    InvalidTopic {
        /// Wire type name of the offending event.
        event_type: &'static str,
        /// The rejected topic string.
        topic: String,
    },

    /// An entity-based topic declares an empty domain.
    #[error("event type {event_type} declares an empty domain")]
    EmptyDomain {
        /// Wire type name of the offending event.
        event_type: &'static str,
    },

    /// An entity-based topic references an entity with an empty name.
    #[error("event type {event_type} references an entity with an empty name")]
    EmptyEntity {
        /// Wire type name of the offending event.
        event_type: &'static str,
    },

    /// A partition-key field has an empty name.
    #[error("event type {event_type} declares a partition-key field with an empty name")]
    EmptyPartitionKeyField {
        /// Wire type name of the offending event.
        event_type: &'static str,
    },

    /// The same partition-key field is declared twice.
    #[error("event type {event_type} declares partition-key field '{field}' more than once")]
    DuplicatePartitionKeyField {
        /// Wire type name of the offending event.
        event_type: &'static str,
        /// The repeated field name.
        field: &'static str,
    },

    /// Two distinct Rust types claim the same wire type name.
    #[error("wire type name '{event_type}' is claimed by both {existing} and {conflicting}")]
    DuplicateEventType {
        /// The contested wire type name.
        event_type: &'static str,
        /// Rust type that registered the name first.
        existing: &'static str,
        /// Rust type that tried to reuse it.
        conflicting: &'static str,
    },

    /// Two different topic sources resolve to the same topic string.
    #[error("topic '{topic}' is produced by both '{first}' and '{second}'")]
    TopicCollision {
        /// The shared topic.
        topic: String,
        /// First topic source.
        first: String,
        /// Second topic source.
        second: String,
    },
}

/// Failure to compute a partition key for an event instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartitionKeyError {
    /// A field value contains the reserved separator.
    #[error("partition-key field '{field}' of {event_type} contains the reserved separator: {value}")]
    SeparatorInValue {
        /// Wire type name of the event.
        event_type: &'static str,
        /// The field whose value was rejected.
        field: &'static str,
        /// The offending value.
        value: String,
    },

    /// The descriptor does not belong to the given event type.
    #[error("descriptor for {descriptor} cannot read fields of {event_type}")]
    DescriptorMismatch {
        /// Wire type name of the event instance.
        event_type: &'static str,
        /// Wire type name the descriptor was built for.
        descriptor: &'static str,
    },
}

/// Errors reported by a message transport. Carried to the caller unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The transport rejected or failed to accept a send.
    #[error("failed to send to topic {topic}: {cause}")]
    SendFailed {
        /// Destination topic.
        topic: String,
        /// Transport-specific cause.
        cause: String,
    },

    /// The transport could not establish a subscription.
    #[error("failed to subscribe to topic {topic}: {cause}")]
    SubscribeFailed {
        /// Requested topic.
        topic: String,
        /// Transport-specific cause.
        cause: String,
    },

    /// The transport has been shut down.
    #[error("transport closed")]
    Closed,
}

/// A received envelope that is not a valid cloud event.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The payload is not a JSON envelope.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A required attribute is missing or has the wrong value.
    #[error("invalid envelope: {reason}")]
    Invalid {
        /// What was wrong with the envelope.
        reason: String,
    },
}

/// Top-level error for publishing integration events.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// The event type's declaration is malformed.
    #[error(transparent)]
    Declaration(#[from] DeclarationError),

    /// The partition key could not be computed.
    #[error(transparent)]
    PartitionKey(#[from] PartitionKeyError),

    /// An internal event was routed to a transport facing other services.
    #[error("internal event {event_type} cannot be published to external topic {topic}")]
    InternalEventOnExternalTransport {
        /// Wire type name of the refused event.
        event_type: String,
        /// The topic the event resolves to.
        topic: String,
    },

    /// The event or its envelope could not be serialized.
    #[error("failed to serialize {event_type}: {cause}")]
    Serialization {
        /// Wire type name of the event.
        event_type: String,
        /// Serializer message.
        cause: String,
    },

    /// The transport failed to accept the message.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The operation was cancelled before the transport accepted it.
    #[error("operation cancelled")]
    Cancelled,
}

impl From<MessagingError> for DomainError {
    fn from(err: MessagingError) -> Self {
        DomainError::Publish(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_event_error_names_event_and_topic() {
        let err = MessagingError::InternalEventOnExternalTransport {
            event_type: "InvoiceTotalsRecalculated".to_owned(),
            topic: "billing.invoice".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "internal event InvoiceTotalsRecalculated cannot be published to external topic billing.invoice"
        );
    }

    #[test]
    fn test_transport_error_is_carried_unmodified() {
        let cause = TransportError::SendFailed {
            topic: "billing.cashier".to_owned(),
            cause: "broker unavailable".to_owned(),
        };
        let err = MessagingError::from(cause.clone());
        match err {
            MessagingError::Transport(inner) => assert_eq!(inner, cause),
            other => panic!("expected Transport, got {other:?}"),
        }
    }

    #[test]
    fn test_messaging_error_converts_to_domain_publish_error() {
        let err: DomainError = MessagingError::Cancelled.into();
        match err {
            DomainError::Publish(msg) => assert_eq!(msg, "operation cancelled"),
            other => panic!("expected Publish, got {other:?}"),
        }
    }
}
