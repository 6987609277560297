//! Event registry: the process-wide descriptor cache, owned explicitly.
//!
//! Built once at startup and shared by reference (`Arc<EventRegistry>`).
//! Descriptors are computed on first use of a type and kept for the
//! registry's lifetime; computation is pure, so concurrent first use simply
//! keeps whichever identical descriptor was inserted first.

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use crate::descriptor::{EventDescriptor, TopicSource};
use crate::error::DeclarationError;
use crate::event::Event;
use crate::topic::{DelimitedTopicConvention, TopicNamingConvention};

/// Cache of event descriptors keyed by type identity.
#[derive(Debug)]
pub struct EventRegistry {
    convention: Arc<dyn TopicNamingConvention>,
    descriptors: RwLock<HashMap<TypeId, Arc<EventDescriptor>>>,
    by_event_type: RwLock<HashMap<&'static str, Arc<EventDescriptor>>>,
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRegistry {
    /// Creates a registry using the default `domain.entity` convention.
    #[must_use]
    pub fn new() -> Self {
        Self::with_convention(Arc::new(DelimitedTopicConvention::default()))
    }

    /// Creates a registry resolving entity topics through `convention`.
    #[must_use]
    pub fn with_convention(convention: Arc<dyn TopicNamingConvention>) -> Self {
        Self {
            convention,
            descriptors: RwLock::new(HashMap::new()),
            by_event_type: RwLock::new(HashMap::new()),
        }
    }

    /// The topic naming convention in use.
    #[must_use]
    pub fn convention(&self) -> &dyn TopicNamingConvention {
        self.convention.as_ref()
    }

    /// Returns the descriptor of `E`, computing and caching it on first use.
    ///
    /// # Errors
    ///
    /// Returns `DeclarationError` if `E`'s declaration is malformed or its
    /// wire type name is already taken by another type.
    pub fn describe<E: Event>(&self) -> Result<Arc<EventDescriptor>, DeclarationError> {
        let type_id = TypeId::of::<E>();
        if let Some(existing) = self
            .descriptors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
        {
            return Ok(Arc::clone(existing));
        }

        let computed = Arc::new(EventDescriptor::extract::<E>(self.convention.as_ref())?);

        let mut by_event_type = self
            .by_event_type
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut descriptors = self
            .descriptors
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = descriptors.get(&type_id) {
            return Ok(Arc::clone(existing));
        }

        match by_event_type.entry(E::EVENT_TYPE) {
            Entry::Occupied(entry) => {
                return Err(DeclarationError::DuplicateEventType {
                    event_type: E::EVENT_TYPE,
                    existing: entry.get().type_name(),
                    conflicting: type_name::<E>(),
                });
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&computed));
            }
        }
        descriptors.insert(type_id, Arc::clone(&computed));

        debug!(
            event_type = %computed.event_type(),
            topic = %computed.topic(),
            class = ?computed.class(),
            internal = computed.is_internal(),
            partition_key_fields = computed.partition_key_fields().len(),
            "Event descriptor cached"
        );

        Ok(computed)
    }

    /// Describes `E` eagerly at startup so declaration errors surface before
    /// the first publish.
    ///
    /// # Errors
    ///
    /// Returns `DeclarationError` if `E`'s declaration is malformed.
    pub fn register<E: Event>(&self) -> Result<Arc<EventDescriptor>, DeclarationError> {
        let descriptor = self.describe::<E>()?;
        info!(
            event_type = %descriptor.event_type(),
            topic = %descriptor.topic(),
            "Event type registered"
        );
        Ok(descriptor)
    }

    /// Looks up a described type by its wire type name.
    #[must_use]
    pub fn get_by_event_type(&self, event_type: &str) -> Option<Arc<EventDescriptor>> {
        self.by_event_type
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_type)
            .cloned()
    }

    /// All descriptors computed so far, sorted by wire type name.
    #[must_use]
    pub fn descriptors(&self) -> Vec<Arc<EventDescriptor>> {
        let mut all: Vec<Arc<EventDescriptor>> = self
            .by_event_type
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        all.sort_by_key(|d| d.event_type());
        all
    }

    /// Checks that no topic is produced by two different sources, e.g. two
    /// entities whose names differ only in case. Event types of the same
    /// entity share a topic and do not collide.
    ///
    /// # Errors
    ///
    /// Returns `DeclarationError::TopicCollision` for the first collision found.
    pub fn ensure_unique_topics(&self) -> Result<(), DeclarationError> {
        let descriptors = self.descriptors();
        let mut sources: HashMap<&str, (&TopicSource, &'static str)> = HashMap::new();
        for descriptor in &descriptors {
            let source = descriptor.topic_source();
            match sources.get(descriptor.topic()) {
                Some((first, first_type)) if !same_source(first, source) => {
                    return Err(DeclarationError::TopicCollision {
                        topic: descriptor.topic().to_owned(),
                        first: format!("{first} ({first_type})"),
                        second: format!("{source} ({})", descriptor.event_type()),
                    });
                }
                Some(_) => {}
                None => {
                    sources.insert(descriptor.topic(), (source, descriptor.event_type()));
                }
            }
        }
        Ok(())
    }
}

fn same_source(a: &TopicSource, b: &TopicSource) -> bool {
    match (a, b) {
        (TopicSource::Literal, TopicSource::Literal) => true,
        (
            TopicSource::Entity {
                domain: domain_a,
                entity: entity_a,
            },
            TopicSource::Entity {
                domain: domain_b,
                entity: entity_b,
            },
        ) => domain_a == domain_b && entity_a == entity_b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    use super::*;
    use crate::declaration::EventDeclaration;
    use crate::event::TopicEntity;

    struct Invoice;

    impl TopicEntity for Invoice {
        const ENTITY_NAME: &'static str = "Invoice";
    }

    struct LowercaseInvoice;

    impl TopicEntity for LowercaseInvoice {
        const ENTITY_NAME: &'static str = "invoice";
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct InvoiceIssued {
        tenant_id: Uuid,
    }

    impl Event for InvoiceIssued {
        const EVENT_TYPE: &'static str = "InvoiceIssued";
        const MODULE_PATH: &'static str = module_path!();

        fn declare() -> EventDeclaration<Self> {
            EventDeclaration::for_entity::<Invoice>("billing")
                .partition_key("tenant_id", |e: &Self| e.tenant_id)
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct InvoiceVoided {
        tenant_id: Uuid,
    }

    impl Event for InvoiceVoided {
        const EVENT_TYPE: &'static str = "InvoiceVoided";
        const MODULE_PATH: &'static str = module_path!();

        fn declare() -> EventDeclaration<Self> {
            EventDeclaration::for_entity::<Invoice>("billing")
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct ImpostorIssued;

    impl Event for ImpostorIssued {
        const EVENT_TYPE: &'static str = "InvoiceIssued";
        const MODULE_PATH: &'static str = module_path!();

        fn declare() -> EventDeclaration<Self> {
            EventDeclaration::topic("billing.impostor")
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct LowercaseIssued;

    impl Event for LowercaseIssued {
        const EVENT_TYPE: &'static str = "LowercaseIssued";
        const MODULE_PATH: &'static str = module_path!();

        fn declare() -> EventDeclaration<Self> {
            EventDeclaration::for_entity::<LowercaseInvoice>("billing")
        }
    }

    #[test]
    fn test_describe_caches_by_type() {
        let registry = EventRegistry::new();

        let first = registry.describe::<InvoiceIssued>().unwrap();
        let second = registry.describe::<InvoiceIssued>().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.descriptors().len(), 1);
    }

    #[test]
    fn test_lookup_by_event_type() {
        let registry = EventRegistry::new();
        registry.register::<InvoiceIssued>().unwrap();

        let found = registry.get_by_event_type("InvoiceIssued").unwrap();

        assert_eq!(found.topic(), "billing.invoice");
        assert!(registry.get_by_event_type("Unknown").is_none());
    }

    #[test]
    fn test_duplicate_wire_type_name_fails_fast() {
        let registry = EventRegistry::new();
        registry.register::<InvoiceIssued>().unwrap();

        let err = registry.describe::<ImpostorIssued>().unwrap_err();

        match err {
            DeclarationError::DuplicateEventType { event_type, .. } => {
                assert_eq!(event_type, "InvoiceIssued");
            }
            other => panic!("expected DuplicateEventType, got {other:?}"),
        }
    }

    #[test]
    fn test_concurrent_first_use_yields_single_descriptor() {
        let registry = Arc::new(EventRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.describe::<InvoiceIssued>().unwrap())
            })
            .collect();
        let results: Vec<Arc<EventDescriptor>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        let cached = registry.describe::<InvoiceIssued>().unwrap();
        assert!(results.iter().all(|d| Arc::ptr_eq(d, &cached)));
        assert_eq!(registry.descriptors().len(), 1);
    }

    #[test]
    fn test_custom_convention_is_used_for_entity_topics() {
        let registry = EventRegistry::with_convention(Arc::new(DelimitedTopicConvention::new('-')));

        let descriptor = registry.describe::<InvoiceIssued>().unwrap();

        assert_eq!(descriptor.topic(), "billing-invoice");
    }

    #[test]
    fn test_same_entity_events_share_topic_without_collision() {
        let registry = EventRegistry::new();
        registry.register::<InvoiceIssued>().unwrap();
        registry.register::<InvoiceVoided>().unwrap();

        assert!(registry.ensure_unique_topics().is_ok());
    }

    #[test]
    fn test_distinct_entities_on_same_topic_collide() {
        let registry = EventRegistry::new();
        registry.register::<InvoiceIssued>().unwrap();
        registry.register::<LowercaseIssued>().unwrap();

        let err = registry.ensure_unique_topics().unwrap_err();

        match err {
            DeclarationError::TopicCollision { topic, .. } => assert_eq!(topic, "billing.invoice"),
            other => panic!("expected TopicCollision, got {other:?}"),
        }
    }
}
