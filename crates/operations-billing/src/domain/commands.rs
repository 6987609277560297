//! Commands for the Billing context.

use operations_core::command::Command;
use uuid::Uuid;

macro_rules! billing_command {
    ($command:ident) => {
        impl Command for $command {
            fn command_type(&self) -> &'static str {
                stringify!($command)
            }

            fn correlation_id(&self) -> Uuid {
                self.correlation_id
            }

            fn tenant_id(&self) -> Uuid {
                self.tenant_id
            }
        }
    };
}

/// Command to add a cashier.
#[derive(Debug, Clone)]
pub struct CreateCashier {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The owning tenant.
    pub tenant_id: Uuid,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
}

/// Command to change a cashier's contact details.
#[derive(Debug, Clone)]
pub struct UpdateCashier {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The owning tenant.
    pub tenant_id: Uuid,
    /// The cashier identifier.
    pub cashier_id: Uuid,
    /// New display name.
    pub name: String,
    /// New contact email.
    pub email: String,
}

/// Command to remove a cashier.
#[derive(Debug, Clone)]
pub struct DeleteCashier {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The owning tenant.
    pub tenant_id: Uuid,
    /// The cashier identifier.
    pub cashier_id: Uuid,
}

/// Command to issue an invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The owning tenant.
    pub tenant_id: Uuid,
    /// The issuing cashier.
    pub cashier_id: Uuid,
    /// What the invoice is for.
    pub description: String,
    /// Amount due in minor units.
    pub amount_cents: i64,
    /// ISO 4217 currency code.
    pub currency: String,
}

/// Command to record full payment of an invoice.
#[derive(Debug, Clone)]
pub struct PayInvoice {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The owning tenant.
    pub tenant_id: Uuid,
    /// The invoice identifier.
    pub invoice_id: Uuid,
    /// Amount paid in minor units.
    pub amount_cents: i64,
}

/// Command to withdraw an open invoice.
#[derive(Debug, Clone)]
pub struct CancelInvoice {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The owning tenant.
    pub tenant_id: Uuid,
    /// The invoice identifier.
    pub invoice_id: Uuid,
    /// Why the invoice is cancelled.
    pub reason: String,
}

/// Command to change the amount due on an open invoice.
#[derive(Debug, Clone)]
pub struct AdjustInvoiceAmount {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The owning tenant.
    pub tenant_id: Uuid,
    /// The invoice identifier.
    pub invoice_id: Uuid,
    /// New amount due in minor units.
    pub amount_cents: i64,
}

billing_command!(CreateCashier);
billing_command!(UpdateCashier);
billing_command!(DeleteCashier);
billing_command!(CreateInvoice);
billing_command!(PayInvoice);
billing_command!(CancelInvoice);
billing_command!(AdjustInvoiceAmount);
