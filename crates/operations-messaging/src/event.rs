//! Event trait definition for type-safe publishing and consuming.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::declaration::EventDeclaration;

/// Trait for types that can be published and consumed as messages.
///
/// Implementors name the wire type, record the module that declares them
/// and return a static declaration of their topic and partition key.
/// Types declared in a module named `integration_events` are integration
/// events and travel inside a cloud-event envelope.
///
/// # Example
///
/// ```rust
/// use operations_messaging::{Event, EventDeclaration, TopicEntity};
/// use serde::{Deserialize, Serialize};
/// use uuid::Uuid;
///
/// pub struct Order;
///
/// impl TopicEntity for Order {
///     const ENTITY_NAME: &'static str = "Order";
/// }
///
/// #[derive(Debug, Serialize, Deserialize)]
/// pub struct OrderCompleted {
///     pub tenant_id: Uuid,
///     pub order_id: Uuid,
/// }
///
/// impl Event for OrderCompleted {
///     const EVENT_TYPE: &'static str = "OrderCompleted";
///     const MODULE_PATH: &'static str = module_path!();
///
///     fn declare() -> EventDeclaration<Self> {
///         EventDeclaration::for_entity::<Order>("billing").partition_key("tenant_id", |e: &OrderCompleted| e.tenant_id)
///     }
/// }
/// ```
pub trait Event: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Wire type name, written to the envelope `type` attribute.
    const EVENT_TYPE: &'static str;

    /// Path of the declaring module. Implementations use `module_path!()`.
    const MODULE_PATH: &'static str;

    /// Static declaration of topic, visibility and partition key.
    fn declare() -> EventDeclaration<Self>;
}

/// An entity whose events share a topic derived from the entity name.
pub trait TopicEntity: 'static {
    /// Entity name fed to the topic naming convention, e.g. `Cashier`.
    const ENTITY_NAME: &'static str;
}
