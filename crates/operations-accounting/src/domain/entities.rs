//! Entities for the Accounting context.

use chrono::{DateTime, Utc};
use operations_core::error::DomainError;
use operations_core::repository::Entity;
use operations_messaging::TopicEntity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the ledger paid invoices are booked on.
pub const RECEIVABLES_LEDGER_NAME: &str = "Accounts Receivable";

/// A running balance in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    /// Ledger identifier.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Ledger name, unique per tenant and currency.
    pub name: String,
    /// ISO 4217 currency code of every entry.
    pub currency: String,
    /// Sum of all entries in minor units.
    pub balance_cents: i64,
    /// When the ledger was opened.
    pub created_at: DateTime<Utc>,
}

impl Ledger {
    /// Opens an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the name is blank or the
    /// currency is not a three-letter code.
    pub fn open(
        id: Uuid,
        tenant_id: Uuid,
        name: &str,
        currency: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation("ledger name must not be empty".into()));
        }
        let code = currency.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DomainError::Validation(format!(
                "'{currency}' is not a three-letter currency code"
            )));
        }
        Ok(Self {
            id,
            tenant_id,
            name: name.to_owned(),
            currency: code.to_ascii_uppercase(),
            balance_cents: 0,
            created_at: now,
        })
    }

    /// Books `amount_cents` in `currency` and returns the new entry.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a zero amount or a currency
    /// other than the ledger's, and `DomainError::InvalidState` if the
    /// balance would overflow.
    pub fn record(
        &mut self,
        entry_id: Uuid,
        amount_cents: i64,
        currency: &str,
        invoice_id: Option<Uuid>,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry, DomainError> {
        if amount_cents == 0 {
            return Err(DomainError::Validation("entry amount must not be zero".into()));
        }
        if !currency.trim().eq_ignore_ascii_case(&self.currency) {
            return Err(DomainError::Validation(format!(
                "ledger {} is kept in {}, not {currency}",
                self.id, self.currency
            )));
        }
        self.balance_cents =
            self.balance_cents
                .checked_add(amount_cents)
                .ok_or_else(|| DomainError::InvalidState {
                    entity_id: self.id,
                    reason: "balance overflow".into(),
                })?;

        Ok(LedgerEntry {
            id: entry_id,
            tenant_id: self.tenant_id,
            ledger_id: self.id,
            amount_cents,
            currency: self.currency.clone(),
            invoice_id,
            description: description.trim().to_owned(),
            recorded_at: now,
        })
    }
}

impl Entity for Ledger {
    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

impl TopicEntity for Ledger {
    const ENTITY_NAME: &'static str = "Ledger";
}

/// One booking on a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry identifier.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Ledger booked on.
    pub ledger_id: Uuid,
    /// Signed amount in minor units.
    pub amount_cents: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Invoice the entry settles, if any.
    pub invoice_id: Option<Uuid>,
    /// Free-text description.
    pub description: String,
    /// When the entry was booked.
    pub recorded_at: DateTime<Utc>,
}

impl Entity for LedgerEntry {
    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    fn ledger() -> Ledger {
        Ledger::open(Uuid::new_v4(), Uuid::new_v4(), RECEIVABLES_LEDGER_NAME, "eur", now()).unwrap()
    }

    #[test]
    fn test_open_ledger_starts_at_zero() {
        let ledger = ledger();
        assert_eq!(ledger.balance_cents, 0);
        assert_eq!(ledger.currency, "EUR");
    }

    #[test]
    fn test_record_updates_balance() {
        let mut ledger = ledger();

        let entry = ledger
            .record(Uuid::new_v4(), 12_500, "EUR", None, "Invoice payment", now())
            .unwrap();
        ledger
            .record(Uuid::new_v4(), -2_500, "eur", None, "Refund", now())
            .unwrap();

        assert_eq!(entry.ledger_id, ledger.id);
        assert_eq!(ledger.balance_cents, 10_000);
    }

    #[test]
    fn test_record_rejects_zero_and_foreign_currency() {
        let mut ledger = ledger();

        let zero = ledger.record(Uuid::new_v4(), 0, "EUR", None, "", now());
        let foreign = ledger.record(Uuid::new_v4(), 100, "USD", None, "", now());

        assert!(matches!(zero, Err(DomainError::Validation(_))));
        assert!(matches!(foreign, Err(DomainError::Validation(_))));
        assert_eq!(ledger.balance_cents, 0);
    }

    #[test]
    fn test_record_rejects_overflow() {
        let mut ledger = ledger();
        ledger
            .record(Uuid::new_v4(), i64::MAX, "EUR", None, "", now())
            .unwrap();

        let result = ledger.record(Uuid::new_v4(), 1, "EUR", None, "", now());

        assert!(matches!(result, Err(DomainError::InvalidState { .. })));
        assert_eq!(ledger.balance_cents, i64::MAX);
    }
}
