//! Accounting integration events.

use chrono::{DateTime, Utc};
use operations_messaging::{Event, EventDeclaration};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::DOMAIN;
use crate::domain::entities::Ledger;

/// A ledger was opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerCreated {
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// The new ledger.
    pub ledger_id: Uuid,
    /// Ledger name.
    pub name: String,
    /// ISO 4217 currency code of every entry.
    pub currency: String,
    /// When the ledger was opened.
    pub occurred_at: DateTime<Utc>,
}

impl Event for LedgerCreated {
    const EVENT_TYPE: &'static str = "LedgerCreated";
    const MODULE_PATH: &'static str = module_path!();

    fn declare() -> EventDeclaration<Self> {
        EventDeclaration::for_entity::<Ledger>(DOMAIN)
            .partition_key_ordered("tenant_id", 0, |e: &Self| e.tenant_id)
            .partition_key_ordered("ledger_id", 1, |e: &Self| e.ledger_id)
    }
}

/// An entry was booked on a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntryRecorded {
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// The ledger booked on.
    pub ledger_id: Uuid,
    /// The new entry.
    pub entry_id: Uuid,
    /// Signed amount in minor units.
    pub amount_cents: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Invoice the entry settles, if any.
    pub invoice_id: Option<Uuid>,
    /// Ledger balance after the entry.
    pub balance_cents: i64,
    /// When the entry was booked.
    pub recorded_at: DateTime<Utc>,
}

impl Event for LedgerEntryRecorded {
    const EVENT_TYPE: &'static str = "LedgerEntryRecorded";
    const MODULE_PATH: &'static str = module_path!();

    fn declare() -> EventDeclaration<Self> {
        EventDeclaration::for_entity::<Ledger>(DOMAIN)
            .partition_key_ordered("tenant_id", 0, |e: &Self| e.tenant_id)
            .partition_key_ordered("ledger_id", 1, |e: &Self| e.ledger_id)
    }
}
