//! Event descriptors: the validated, type-erased metadata of an event type.

use std::any::{Any, type_name};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::declaration::TopicDeclaration;
use crate::error::DeclarationError;
use crate::event::Event;
use crate::topic::{TopicNamingConvention, is_valid_topic};

/// Last module segment that marks a type as an integration event.
pub const INTEGRATION_EVENTS_SEGMENT: &str = "integration_events";

/// Whether a message crosses service boundaries inside an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageClass {
    /// Declared in an `integration_events` module; wrapped before sending.
    Integration,
    /// Any other message; sent in its raw serialized form.
    NonIntegration,
}

impl MessageClass {
    /// Classifies a message by the module that declares its type.
    #[must_use]
    pub fn from_module_path(module_path: &str) -> Self {
        match module_path.rsplit("::").next() {
            Some(INTEGRATION_EVENTS_SEGMENT) => Self::Integration,
            _ => Self::NonIntegration,
        }
    }
}

/// What a topic was derived from. Used to detect collisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicSource {
    /// A literal topic string.
    Literal,
    /// An entity within a domain.
    Entity {
        /// Owning domain as declared.
        domain: String,
        /// Entity name as declared.
        entity: &'static str,
    },
}

impl fmt::Display for TopicSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal => f.write_str("literal"),
            Self::Entity { domain, entity } => write!(f, "{domain}/{entity}"),
        }
    }
}

type ErasedExtractor = Arc<dyn Fn(&dyn Any) -> Option<String> + Send + Sync>;

/// A partition-key field in resolution order.
#[derive(Clone)]
pub struct PartitionKeyField {
    name: &'static str,
    order: i32,
    extract: ErasedExtractor,
}

impl PartitionKeyField {
    /// Field name as declared.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared position within the composite key.
    #[must_use]
    pub fn order(&self) -> i32 {
        self.order
    }

    /// Reads the field from `event`. `None` if `event` is not the type this
    /// field was declared on.
    pub(crate) fn read(&self, event: &dyn Any) -> Option<String> {
        (self.extract)(event)
    }
}

impl fmt::Debug for PartitionKeyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionKeyField")
            .field("name", &self.name)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

/// Immutable per-type metadata derived from an event declaration.
#[derive(Debug, Clone)]
pub struct EventDescriptor {
    event_type: &'static str,
    type_name: &'static str,
    module_path: &'static str,
    topic: String,
    topic_source: TopicSource,
    domain: Option<String>,
    is_internal: bool,
    class: MessageClass,
    partition_key_fields: Vec<PartitionKeyField>,
}

impl EventDescriptor {
    /// Builds the descriptor of `E`, resolving entity topics through
    /// `convention`.
    ///
    /// # Errors
    ///
    /// Returns `DeclarationError` if the declaration is malformed.
    pub fn extract<E: Event>(
        convention: &dyn TopicNamingConvention,
    ) -> Result<Self, DeclarationError> {
        let event_type = E::EVENT_TYPE;
        if event_type.trim().is_empty() {
            return Err(DeclarationError::EmptyEventType {
                type_name: type_name::<E>(),
            });
        }

        let declaration = E::declare();

        let (topic, topic_source, domain) = match declaration.topic {
            TopicDeclaration::Literal { topic, domain } => (topic, TopicSource::Literal, domain),
            TopicDeclaration::Entity { domain, entity } => {
                if domain.trim().is_empty() {
                    return Err(DeclarationError::EmptyDomain { event_type });
                }
                if entity.trim().is_empty() {
                    return Err(DeclarationError::EmptyEntity { event_type });
                }
                let topic = convention.topic_for(&domain, entity);
                (
                    topic,
                    TopicSource::Entity {
                        domain: domain.clone(),
                        entity,
                    },
                    Some(domain),
                )
            }
        };

        if topic.is_empty() {
            return Err(DeclarationError::EmptyTopic { event_type });
        }
        if !is_valid_topic(&topic) {
            return Err(DeclarationError::InvalidTopic { event_type, topic });
        }

        let mut seen = HashSet::new();
        let mut partition_key_fields = Vec::with_capacity(declaration.partition_keys.len());
        for key in declaration.partition_keys {
            if key.name.trim().is_empty() {
                return Err(DeclarationError::EmptyPartitionKeyField { event_type });
            }
            if !seen.insert(key.name) {
                return Err(DeclarationError::DuplicatePartitionKeyField {
                    event_type,
                    field: key.name,
                });
            }
            let extract = key.extract;
            partition_key_fields.push(PartitionKeyField {
                name: key.name,
                order: key.order,
                extract: Arc::new(move |event: &dyn Any| {
                    event.downcast_ref::<E>().map(|typed| extract(typed))
                }),
            });
        }
        // Stable sort: equal orders keep declaration order.
        partition_key_fields.sort_by_key(PartitionKeyField::order);

        Ok(Self {
            event_type,
            type_name: type_name::<E>(),
            module_path: E::MODULE_PATH,
            topic,
            topic_source,
            domain,
            is_internal: declaration.internal,
            class: MessageClass::from_module_path(E::MODULE_PATH),
            partition_key_fields,
        })
    }

    /// Wire type name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        self.event_type
    }

    /// Rust type name of the described event.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Module that declares the event type.
    #[must_use]
    pub fn module_path(&self) -> &'static str {
        self.module_path
    }

    /// Destination topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// What the topic was derived from.
    #[must_use]
    pub fn topic_source(&self) -> &TopicSource {
        &self.topic_source
    }

    /// Owning domain, if declared.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// True if the event must stay inside the owning service.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.is_internal
    }

    /// Integration or non-integration message.
    #[must_use]
    pub fn class(&self) -> MessageClass {
        self.class
    }

    /// Partition-key fields in resolution order.
    #[must_use]
    pub fn partition_key_fields(&self) -> &[PartitionKeyField] {
        &self.partition_key_fields
    }
}
