//! Shared fixtures for messaging integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use operations_messaging::{
    Dispatcher, EnvelopeWrapper, Event, EventDeclaration, EventRegistry, TopicEntity, Transport,
};
use operations_test_support::{FixedClock, SequenceIds};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TENANT: &str = "11111111-1111-1111-1111-111111111111";

pub struct Order;

impl TopicEntity for Order {
    const ENTITY_NAME: &'static str = "Order";
}

pub mod integration_events {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct OrderCompleted {
        pub tenant_id: Uuid,
        pub order_id: Uuid,
        pub sequence: u32,
    }

    impl Event for OrderCompleted {
        const EVENT_TYPE: &'static str = "OrderCompleted";
        const MODULE_PATH: &'static str = module_path!();

        fn declare() -> EventDeclaration<Self> {
            EventDeclaration::for_entity::<Order>("billing")
                .partition_key("tenant_id", |e: &Self| e.tenant_id)
        }
    }
}

/// A domain event that must never leave the producing service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTotalsRecalculated {
    pub order_id: Uuid,
    pub total_cents: i64,
}

impl Event for OrderTotalsRecalculated {
    const EVENT_TYPE: &'static str = "OrderTotalsRecalculated";
    const MODULE_PATH: &'static str = module_path!();

    fn declare() -> EventDeclaration<Self> {
        EventDeclaration::for_entity::<Order>("billing").internal()
    }
}

pub fn tenant() -> Uuid {
    Uuid::parse_str(TENANT).unwrap()
}

pub fn order_completed(tenant_id: Uuid, sequence: u32) -> integration_events::OrderCompleted {
    integration_events::OrderCompleted {
        tenant_id,
        order_id: Uuid::new_v4(),
        sequence,
    }
}

pub fn dispatcher(transport: Arc<dyn Transport>, source: &str) -> Dispatcher {
    let wrapper = EnvelopeWrapper::new(
        source,
        Arc::new(FixedClock::reference()),
        Arc::new(SequenceIds::new()),
    );
    Dispatcher::new(Arc::new(EventRegistry::new()), transport, wrapper)
}
