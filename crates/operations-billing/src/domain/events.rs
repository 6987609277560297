//! Domain events private to the Billing service.

use operations_messaging::{Event, EventDeclaration};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::DOMAIN;
use crate::domain::entities::Invoice;

/// The amount due on an open invoice changed. Never leaves Billing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotalsRecalculated {
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// The adjusted invoice.
    pub invoice_id: Uuid,
    /// Amount due before the adjustment.
    pub previous_amount_cents: i64,
    /// Amount due after the adjustment.
    pub amount_cents: i64,
}

impl Event for InvoiceTotalsRecalculated {
    const EVENT_TYPE: &'static str = "InvoiceTotalsRecalculated";
    const MODULE_PATH: &'static str = module_path!();

    fn declare() -> EventDeclaration<Self> {
        EventDeclaration::for_entity::<Invoice>(DOMAIN)
            .internal()
            .partition_key("invoice_id", |e: &Self| e.invoice_id)
    }
}
