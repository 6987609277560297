//! Static event declarations.
//!
//! A declaration is the per-type statement of where an event is published
//! and how it is keyed. Declarations are plain data built once per type;
//! validation happens when the registry turns them into descriptors.

use std::any::type_name;
use std::fmt;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use uuid::Uuid;

use crate::event::TopicEntity;

/// A value with a stable, process-independent string form, usable as a
/// partition-key segment.
pub trait PartitionKeyValue {
    /// Renders the value as a partition-key segment.
    fn to_key_segment(&self) -> String;
}

impl PartitionKeyValue for Uuid {
    fn to_key_segment(&self) -> String {
        self.hyphenated().to_string()
    }
}

impl PartitionKeyValue for String {
    fn to_key_segment(&self) -> String {
        self.clone()
    }
}

impl PartitionKeyValue for str {
    fn to_key_segment(&self) -> String {
        self.to_owned()
    }
}

impl PartitionKeyValue for bool {
    fn to_key_segment(&self) -> String {
        self.to_string()
    }
}

impl PartitionKeyValue for DateTime<Utc> {
    fn to_key_segment(&self) -> String {
        self.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }
}

impl PartitionKeyValue for NaiveDate {
    fn to_key_segment(&self) -> String {
        self.format("%Y-%m-%d").to_string()
    }
}

impl<T: PartitionKeyValue + ?Sized> PartitionKeyValue for &T {
    fn to_key_segment(&self) -> String {
        (**self).to_key_segment()
    }
}

macro_rules! integer_key_values {
    ($($ty:ty),* $(,)?) => {
        $(
            impl PartitionKeyValue for $ty {
                fn to_key_segment(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

integer_key_values!(i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, isize, usize);

/// Where an event's topic comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicDeclaration {
    /// A literal topic string.
    Literal {
        /// The topic.
        topic: String,
        /// Optional owning domain.
        domain: Option<String>,
    },
    /// The topic of an entity within a domain, resolved by the naming convention.
    Entity {
        /// Owning domain, e.g. `billing`.
        domain: String,
        /// Entity name, e.g. `Cashier`.
        entity: &'static str,
    },
}

type Extractor<E> = Box<dyn Fn(&E) -> String + Send + Sync>;

/// One declared partition-key field.
pub struct PartitionKeyDeclaration<E> {
    pub(crate) name: &'static str,
    pub(crate) order: i32,
    pub(crate) extract: Extractor<E>,
}

impl<E> fmt::Debug for PartitionKeyDeclaration<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionKeyDeclaration")
            .field("name", &self.name)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

/// Builder describing an event type's topic, visibility and partition key.
pub struct EventDeclaration<E> {
    pub(crate) topic: TopicDeclaration,
    pub(crate) internal: bool,
    pub(crate) partition_keys: Vec<PartitionKeyDeclaration<E>>,
}

impl<E> fmt::Debug for EventDeclaration<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDeclaration")
            .field("event", &type_name::<E>())
            .field("topic", &self.topic)
            .field("internal", &self.internal)
            .field("partition_keys", &self.partition_keys)
            .finish()
    }
}

impl<E: 'static> EventDeclaration<E> {
    /// Declares a literal topic.
    #[must_use]
    pub fn topic(topic: impl Into<String>) -> Self {
        Self::new(TopicDeclaration::Literal {
            topic: topic.into(),
            domain: None,
        })
    }

    /// Declares that the event belongs to the topic of entity `T` in `domain`.
    #[must_use]
    pub fn for_entity<T: TopicEntity>(domain: impl Into<String>) -> Self {
        Self::new(TopicDeclaration::Entity {
            domain: domain.into(),
            entity: T::ENTITY_NAME,
        })
    }

    fn new(topic: TopicDeclaration) -> Self {
        Self {
            topic,
            internal: false,
            partition_keys: Vec::new(),
        }
    }

    /// Attaches an owning domain to a literal topic. Entity topics already
    /// carry their domain and ignore this.
    #[must_use]
    pub fn in_domain(mut self, domain: impl Into<String>) -> Self {
        if let TopicDeclaration::Literal { domain: slot, .. } = &mut self.topic {
            *slot = Some(domain.into());
        }
        self
    }

    /// Marks the event as internal: deliverable inside the owning service only.
    #[must_use]
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    /// Declares a partition-key field with order 0.
    #[must_use]
    pub fn partition_key<V, F>(self, name: &'static str, extract: F) -> Self
    where
        V: PartitionKeyValue,
        F: Fn(&E) -> V + Send + Sync + 'static,
    {
        self.partition_key_ordered(name, 0, extract)
    }

    /// Declares a partition-key field at an explicit position. Fields are
    /// read in ascending `order`; equal orders keep declaration order.
    #[must_use]
    pub fn partition_key_ordered<V, F>(mut self, name: &'static str, order: i32, extract: F) -> Self
    where
        V: PartitionKeyValue,
        F: Fn(&E) -> V + Send + Sync + 'static,
    {
        self.partition_keys.push(PartitionKeyDeclaration {
            name,
            order,
            extract: Box::new(move |event| extract(event).to_key_segment()),
        });
        self
    }
}
