//! Handlers for integration events Accounting consumes from other services.

use std::sync::Arc;

use async_trait::async_trait;
use operations_core::error::DomainError;
use operations_core::repository::Repository;
use operations_messaging::{Dispatcher, EventHandler, HandlerError, MessagingError};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::command_handlers::{
    AccountingContext, find_ledger, handle_create_ledger, handle_record_entry,
};
use crate::contracts::billing::integration_events::InvoicePaid;
use crate::domain::commands::{CreateLedger, RecordLedgerEntry};
use crate::domain::entities::{Ledger, RECEIVABLES_LEDGER_NAME};

/// Books every paid invoice on the tenant's receivables ledger.
///
/// Redelivered `InvoicePaid` events are recognised by invoice id and
/// booked once.
#[derive(Debug, Clone)]
pub struct InvoicePaidHandler {
    ctx: AccountingContext,
    cancel: CancellationToken,
    booking: Arc<Mutex<()>>,
}

impl InvoicePaidHandler {
    /// Creates a handler publishing its follow-up events until `cancel`
    /// fires.
    #[must_use]
    pub fn new(ctx: AccountingContext, cancel: CancellationToken) -> Self {
        Self {
            ctx,
            cancel,
            booking: Arc::new(Mutex::new(())),
        }
    }

    async fn already_booked(&self, tenant_id: Uuid, invoice_id: Uuid) -> Result<bool, DomainError> {
        Ok(self
            .ctx
            .entries
            .list_by_tenant(tenant_id)
            .await?
            .iter()
            .any(|entry| entry.invoice_id == Some(invoice_id)))
    }

    async fn receivables_ledger(&self, tenant_id: Uuid, currency: &str) -> Result<Ledger, DomainError> {
        if let Some(ledger) = find_ledger(&self.ctx, tenant_id, RECEIVABLES_LEDGER_NAME, currency).await? {
            return Ok(ledger);
        }
        let command = CreateLedger {
            correlation_id: self.ctx.ids.next_id(),
            tenant_id,
            name: RECEIVABLES_LEDGER_NAME.to_owned(),
            currency: currency.to_owned(),
        };
        handle_create_ledger(&command, &self.ctx, &self.cancel).await
    }
}

#[async_trait]
impl EventHandler<InvoicePaid> for InvoicePaidHandler {
    async fn handle(&self, event: InvoicePaid) -> Result<(), HandlerError> {
        let _guard = self.booking.lock().await;

        if self.already_booked(event.tenant_id, event.invoice_id).await? {
            debug!(invoice_id = %event.invoice_id, "Invoice already booked, skipping");
            return Ok(());
        }

        let ledger = self.receivables_ledger(event.tenant_id, &event.currency).await?;
        let command = RecordLedgerEntry {
            correlation_id: self.ctx.ids.next_id(),
            tenant_id: event.tenant_id,
            ledger_id: ledger.id,
            amount_cents: event.amount_cents,
            currency: event.currency.clone(),
            invoice_id: Some(event.invoice_id),
            description: format!("Payment of invoice {}", event.invoice_id),
        };
        let entry = handle_record_entry(&command, &self.ctx, &self.cancel).await?;

        info!(
            invoice_id = %event.invoice_id,
            entry_id = %entry.id,
            ledger_id = %ledger.id,
            "Paid invoice booked"
        );
        Ok(())
    }
}

/// Registers Accounting's consumers on the shared broker dispatcher.
///
/// # Errors
///
/// Returns `MessagingError::Declaration` if a consumed event's declaration
/// is malformed.
pub fn register_consumers(
    integration: &Dispatcher,
    invoice_paid: InvoicePaidHandler,
) -> Result<(), MessagingError> {
    integration.on::<InvoicePaid, _>(invoice_paid)
}
