//! Operations Billing bounded context.
//!
//! Owns cashiers and invoices. State changes are published as integration
//! events on `billing.cashier` and `billing.invoice`; invoice total
//! adjustments travel on the service's internal bus only.

pub mod application;
pub mod contracts;
pub mod domain;

use operations_messaging::{DeclarationError, EventRegistry};

use crate::contracts::integration_events::{
    CashierCreated, CashierDeleted, CashierUpdated, InvoiceCancelled, InvoiceCreated, InvoicePaid,
};
use crate::domain::events::InvoiceTotalsRecalculated;

/// Domain namespace of every Billing topic.
pub const DOMAIN: &str = "billing";

/// Describes every event Billing publishes so declaration errors surface
/// at startup.
///
/// # Errors
///
/// Returns `DeclarationError` if a declaration is malformed or a wire type
/// name is already taken in `registry`.
pub fn register_events(registry: &EventRegistry) -> Result<(), DeclarationError> {
    registry.register::<CashierCreated>()?;
    registry.register::<CashierUpdated>()?;
    registry.register::<CashierDeleted>()?;
    registry.register::<InvoiceCreated>()?;
    registry.register::<InvoicePaid>()?;
    registry.register::<InvoiceCancelled>()?;
    registry.register::<InvoiceTotalsRecalculated>()?;
    Ok(())
}
