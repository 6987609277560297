//! Entities for the Billing context.

use chrono::{DateTime, Utc};
use operations_core::error::DomainError;
use operations_core::repository::Entity;
use operations_messaging::TopicEntity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A person allowed to issue invoices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cashier {
    /// Cashier identifier.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// When the cashier was created.
    pub created_at: DateTime<Utc>,
    /// When the cashier was last changed.
    pub updated_at: DateTime<Utc>,
}

impl Cashier {
    /// Creates a cashier after validating name and email.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the name is blank or the email
    /// is not an address.
    pub fn create(
        id: Uuid,
        tenant_id: Uuid,
        name: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let (name, email) = validate_contact(name, email)?;
        Ok(Self {
            id,
            tenant_id,
            name,
            email,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replaces name and email.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` on the same rules as [`Cashier::create`].
    pub fn update(&mut self, name: &str, email: &str, now: DateTime<Utc>) -> Result<(), DomainError> {
        let (name, email) = validate_contact(name, email)?;
        self.name = name;
        self.email = email;
        self.updated_at = now;
        Ok(())
    }
}

fn validate_contact(name: &str, email: &str) -> Result<(String, String), DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::Validation("cashier name must not be empty".into()));
    }
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ => {
            return Err(DomainError::Validation(format!(
                "'{email}' is not a valid email address"
            )));
        }
    }
    Ok((name.to_owned(), email.to_lowercase()))
}

impl Entity for Cashier {
    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

impl TopicEntity for Cashier {
    const ENTITY_NAME: &'static str = "Cashier";
}

/// Lifecycle state of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Issued and awaiting payment.
    Open,
    /// Settled in full.
    Paid,
    /// Withdrawn before payment.
    Cancelled,
}

/// An amount owed to a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Invoice identifier.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Cashier who issued the invoice.
    pub cashier_id: Uuid,
    /// What the invoice is for.
    pub description: String,
    /// Amount due in minor units.
    pub amount_cents: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Current lifecycle state.
    pub status: InvoiceStatus,
    /// When the invoice was issued.
    pub created_at: DateTime<Utc>,
    /// When the invoice was paid.
    pub paid_at: Option<DateTime<Utc>>,
    /// When the invoice was cancelled.
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// Issues a new open invoice.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the amount is not positive or
    /// the currency is not a three-letter code.
    pub fn create(
        id: Uuid,
        tenant_id: Uuid,
        cashier_id: Uuid,
        description: &str,
        amount_cents: i64,
        currency: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        validate_amount(amount_cents)?;
        let currency = normalize_currency(currency)?;
        Ok(Self {
            id,
            tenant_id,
            cashier_id,
            description: description.trim().to_owned(),
            amount_cents,
            currency,
            status: InvoiceStatus::Open,
            created_at: now,
            paid_at: None,
            cancelled_at: None,
        })
    }

    /// Records full payment.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` unless the invoice is open, and
    /// `DomainError::Validation` if `amount_cents` differs from the amount due.
    pub fn pay(&mut self, amount_cents: i64, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_open("pay")?;
        if amount_cents != self.amount_cents {
            return Err(DomainError::Validation(format!(
                "payment of {amount_cents} does not match amount due {}",
                self.amount_cents
            )));
        }
        self.status = InvoiceStatus::Paid;
        self.paid_at = Some(now);
        Ok(())
    }

    /// Withdraws the invoice.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` unless the invoice is open.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_open("cancel")?;
        self.status = InvoiceStatus::Cancelled;
        self.cancelled_at = Some(now);
        Ok(())
    }

    /// Changes the amount due, returning the previous amount.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` unless the invoice is open and
    /// `DomainError::Validation` if the new amount is not positive.
    pub fn adjust_amount(&mut self, amount_cents: i64) -> Result<i64, DomainError> {
        self.ensure_open("adjust")?;
        validate_amount(amount_cents)?;
        Ok(std::mem::replace(&mut self.amount_cents, amount_cents))
    }

    fn ensure_open(&self, action: &str) -> Result<(), DomainError> {
        match self.status {
            InvoiceStatus::Open => Ok(()),
            status => Err(DomainError::InvalidState {
                entity_id: self.id,
                reason: format!("cannot {action} an invoice that is {status:?}"),
            }),
        }
    }
}

fn validate_amount(amount_cents: i64) -> Result<(), DomainError> {
    if amount_cents <= 0 {
        return Err(DomainError::Validation(format!(
            "amount must be positive, got {amount_cents}"
        )));
    }
    Ok(())
}

fn normalize_currency(currency: &str) -> Result<String, DomainError> {
    let code = currency.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(DomainError::Validation(format!(
            "'{currency}' is not a three-letter currency code"
        )));
    }
    Ok(code.to_ascii_uppercase())
}

impl Entity for Invoice {
    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

impl TopicEntity for Invoice {
    const ENTITY_NAME: &'static str = "Invoice";
}
