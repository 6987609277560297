//! Billing integration events.
//!
//! Everything declared here crosses the service boundary inside a
//! cloud-event envelope. Field names and types are a wire contract:
//! consumers declare their own copies and deserialize by field name.

use chrono::{DateTime, Utc};
use operations_messaging::{Event, EventDeclaration};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::DOMAIN;
use crate::domain::entities::{Cashier, Invoice};

fn cashier_topic<E>(cashier_id: fn(&E) -> Uuid) -> EventDeclaration<E>
where
    E: Event + TenantScoped,
{
    EventDeclaration::for_entity::<Cashier>(DOMAIN)
        .partition_key_ordered("tenant_id", 0, tenant_of::<E>)
        .partition_key_ordered("cashier_id", 1, cashier_id)
}

fn invoice_topic<E>(invoice_id: fn(&E) -> Uuid) -> EventDeclaration<E>
where
    E: Event + TenantScoped,
{
    EventDeclaration::for_entity::<Invoice>(DOMAIN)
        .partition_key_ordered("tenant_id", 0, tenant_of::<E>)
        .partition_key_ordered("invoice_id", 1, invoice_id)
}

/// Events owned by a tenant.
pub trait TenantScoped {
    /// The owning tenant.
    fn tenant_id(&self) -> Uuid;
}

fn tenant_of<E: TenantScoped>(event: &E) -> Uuid {
    event.tenant_id()
}

macro_rules! tenant_scoped {
    ($($event:ty),* $(,)?) => {
        $(
            impl TenantScoped for $event {
                fn tenant_id(&self) -> Uuid {
                    self.tenant_id
                }
            }
        )*
    };
}

/// A cashier was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashierCreated {
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// The new cashier.
    pub cashier_id: Uuid,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// When the cashier was created.
    pub occurred_at: DateTime<Utc>,
}

impl Event for CashierCreated {
    const EVENT_TYPE: &'static str = "CashierCreated";
    const MODULE_PATH: &'static str = module_path!();

    fn declare() -> EventDeclaration<Self> {
        cashier_topic(|e: &Self| e.cashier_id)
    }
}

/// A cashier's contact details changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashierUpdated {
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// The changed cashier.
    pub cashier_id: Uuid,
    /// New display name.
    pub name: String,
    /// New contact email.
    pub email: String,
    /// When the change happened.
    pub occurred_at: DateTime<Utc>,
}

impl Event for CashierUpdated {
    const EVENT_TYPE: &'static str = "CashierUpdated";
    const MODULE_PATH: &'static str = module_path!();

    fn declare() -> EventDeclaration<Self> {
        cashier_topic(|e: &Self| e.cashier_id)
    }
}

/// A cashier was removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashierDeleted {
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// The removed cashier.
    pub cashier_id: Uuid,
    /// When the cashier was removed.
    pub occurred_at: DateTime<Utc>,
}

impl Event for CashierDeleted {
    const EVENT_TYPE: &'static str = "CashierDeleted";
    const MODULE_PATH: &'static str = module_path!();

    fn declare() -> EventDeclaration<Self> {
        cashier_topic(|e: &Self| e.cashier_id)
    }
}

/// An invoice was issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCreated {
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// The new invoice.
    pub invoice_id: Uuid,
    /// Issuing cashier.
    pub cashier_id: Uuid,
    /// What the invoice is for.
    pub description: String,
    /// Amount due in minor units.
    pub amount_cents: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// When the invoice was issued.
    pub occurred_at: DateTime<Utc>,
}

impl Event for InvoiceCreated {
    const EVENT_TYPE: &'static str = "InvoiceCreated";
    const MODULE_PATH: &'static str = module_path!();

    fn declare() -> EventDeclaration<Self> {
        invoice_topic(|e: &Self| e.invoice_id)
    }
}

/// An invoice was paid in full.
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
        invoice_topic(|e: &Self| e.invoice_id)
    }
}

/// An invoice was withdrawn before payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCancelled {
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// The cancelled invoice.
    pub invoice_id: Uuid,
    /// Why the invoice was cancelled.
    pub reason: String,
    /// When the invoice was cancelled.
    pub cancelled_at: DateTime<Utc>,
}

impl Event for InvoiceCancelled {
    const EVENT_TYPE: &'static str = "InvoiceCancelled";
    const MODULE_PATH: &'static str = module_path!();

    fn declare() -> EventDeclaration<Self> {
        invoice_topic(|e: &Self| e.invoice_id)
    }
}

tenant_scoped!(
    CashierCreated,
    CashierUpdated,
    CashierDeleted,
    InvoiceCreated,
    InvoicePaid,
    InvoiceCancelled,
);

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use operations_messaging::{EventRegistry, resolve_partition_key};

    use super::*;

    #[test]
    fn test_invoice_events_are_keyed_by_tenant_then_invoice() {
        // Arrange
        let registry = EventRegistry::new();
        let descriptor = registry.describe::<InvoicePaid>().unwrap();
        let event = InvoicePaid {
            tenant_id: Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap(),
            invoice_id: Uuid::parse_str("22222222-2222-2222-2222-222222222222").unwrap(),
            amount_cents: 12_500,
            currency: "EUR".to_owned(),
            paid_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        };

        // Act
        let key = resolve_partition_key(&event, &descriptor).unwrap().unwrap();

        // Assert
        assert_eq!(descriptor.topic(), "billing.invoice");
        assert_eq!(
            key.as_str(),
            "11111111-1111-1111-1111-111111111111|22222222-2222-2222-2222-222222222222"
        );
    }

    #[test]
    fn test_cashier_events_share_the_cashier_topic() {
        let registry = EventRegistry::new();

        let created = registry.describe::<CashierCreated>().unwrap();
        let deleted = registry.describe::<CashierDeleted>().unwrap();

        assert_eq!(created.topic(), "billing.cashier");
        assert_eq!(deleted.topic(), "billing.cashier");
        assert_eq!(created.domain(), Some("billing"));
        let fields: Vec<&str> = created
            .partition_key_fields()
            .iter()
            .map(|f| f.name())
            .collect();
        assert_eq!(fields, vec!["tenant_id", "cashier_id"]);
    }
}
