//! Accounting's copy of the Billing events it consumes.
//!
//! Only the fields Accounting reads are declared; unknown fields in the
//! payload are ignored on deserialization.

use chrono::{DateTime, Utc};
use operations_messaging::{Event, EventDeclaration, TopicEntity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Billing's invoice entity, named only to derive its topic.
#[derive(Debug)]
pub struct Invoice;

impl TopicEntity for Invoice {
    const ENTITY_NAME: &'static str = "Invoice";
}

/// Billing recorded full payment of an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePaid {
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// The paid invoice.
    pub invoice_id: Uuid,
    /// Amount paid in minor units.
    pub amount_cents: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// When payment was recorded.
    pub paid_at: DateTime<Utc>,
}

impl Event for InvoicePaid {
    const EVENT_TYPE: &'static str = "InvoicePaid";
    const MODULE_PATH: &'static str = module_path!();

    fn declare() -> EventDeclaration<Self> {
        EventDeclaration::for_entity::<Invoice>("billing")
            .partition_key_ordered("tenant_id", 0, |e: &Self| e.tenant_id)
            .partition_key_ordered("invoice_id", 1, |e: &Self| e.invoice_id)
    }
}
