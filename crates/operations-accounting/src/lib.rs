//! Operations Accounting bounded context.
//!
//! Owns ledgers and their entries, publishes on `accounting.ledger`, and
//! books Billing's paid invoices. Billing's events are consumed through
//! Accounting's own copies of the wire contracts; the two services share
//! no types.

pub mod application;
pub mod contracts;
pub mod domain;

use operations_messaging::{DeclarationError, EventRegistry};

use crate::contracts::integration_events::{LedgerCreated, LedgerEntryRecorded};

/// Domain namespace of every Accounting topic.
pub const DOMAIN: &str = "accounting";

/// Describes every event Accounting publishes so declaration errors
/// surface at startup.
///
/// # Errors
///
/// Returns `DeclarationError` if a declaration is malformed or a wire type
/// name is already taken in `registry`.
pub fn register_events(registry: &EventRegistry) -> Result<(), DeclarationError> {
    registry.register::<LedgerCreated>()?;
    registry.register::<LedgerEntryRecorded>()?;
    Ok(())
}
