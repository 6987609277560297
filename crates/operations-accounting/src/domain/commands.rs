//! Commands for the Accounting context.

use operations_core::command::Command;
use uuid::Uuid;

/// Command to open a ledger.
#[derive(Debug, Clone)]
pub struct CreateLedger {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The owning tenant.
    pub tenant_id: Uuid,
    /// Ledger name.
    pub name: String,
    /// ISO 4217 currency code.
    pub currency: String,
}

impl Command for CreateLedger {
    fn command_type(&self) -> &'static str {
        "CreateLedger"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

/// Command to book an entry on a ledger.
#[derive(Debug, Clone)]
pub struct RecordLedgerEntry {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The owning tenant.
    pub tenant_id: Uuid,
    /// The ledger identifier.
    pub ledger_id: Uuid,
    /// Signed amount in minor units.
    pub amount_cents: i64,
    /// ISO 4217 currency code; must match the ledger's.
    pub currency: String,
    /// Invoice the entry settles, if any.
    pub invoice_id: Option<Uuid>,
    /// Free-text description.
    pub description: String,
}

impl Command for RecordLedgerEntry {
    fn command_type(&self) -> &'static str {
        "RecordLedgerEntry"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}
