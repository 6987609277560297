//! Operations Messaging: integration-event routing between services.
//!
//! Event types declare their topic, visibility and partition key once
//! ([`Event::declare`]). The [`EventRegistry`] turns declarations into
//! cached [`EventDescriptor`]s, the [`Dispatcher`] uses them to route
//! outgoing events (topic, partition key, cloud-event envelope) and to hand
//! inbound messages to typed handlers. Brokers plug in behind [`Transport`];
//! [`InMemoryBroker`] is the in-process implementation.

pub mod declaration;
pub mod descriptor;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod event;
pub mod in_memory;
pub mod partition_key;
pub mod registry;
pub mod topic;
pub mod transport;

pub use declaration::{EventDeclaration, PartitionKeyValue, TopicDeclaration};
pub use descriptor::{EventDescriptor, MessageClass, PartitionKeyField, TopicSource};
pub use dispatcher::{DispatchOutcome, Dispatcher, EventHandler, HandlerError, PublishReceipt};
pub use envelope::{
    CLOUDEVENTS_SPEC_VERSION, CloudEventEnvelope, ENVELOPE_CONTENT_TYPE, EnvelopeWrapper,
    JSON_CONTENT_TYPE, MessageBody, MessageStage, OutgoingMessage,
};
pub use error::{
    DeclarationError, EnvelopeError, MessagingError, PartitionKeyError, TransportError,
};
pub use event::{Event, TopicEntity};
pub use in_memory::{DEFAULT_PARTITION_COUNT, InMemoryBroker, SentRecord, partition_for_key};
pub use partition_key::{PARTITION_KEY_SEPARATOR, PartitionKey, resolve_partition_key};
pub use registry::EventRegistry;
pub use topic::{
    DEFAULT_TOPIC_DELIMITER, DelimitedTopicConvention, TopicNamingConvention, is_valid_topic,
};
pub use transport::{
    InboundHandler, InboundMessage, MessageMetadata, Transport, TransportMessage, TransportScope,
};
