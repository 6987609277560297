//! Command handlers for the Billing context.
//!
//! Each handler validates through the entity, persists, then publishes
//! the resulting event. Integration events go through the shared broker,
//! internal events through the service's own bus.

use std::sync::Arc;

use operations_core::clock::Clock;
use operations_core::command::Command;
use operations_core::error::DomainError;
use operations_core::ids::IdGenerator;
use operations_core::repository::Repository;
use operations_messaging::Dispatcher;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::contracts::integration_events::{
    CashierCreated, CashierDeleted, CashierUpdated, InvoiceCancelled, InvoiceCreated, InvoicePaid,
};
use crate::domain::commands::{
    AdjustInvoiceAmount, CancelInvoice, CreateCashier, CreateInvoice, DeleteCashier, PayInvoice,
    UpdateCashier,
};
use crate::domain::entities::{Cashier, Invoice, InvoiceStatus};
use crate::domain::events::InvoiceTotalsRecalculated;

/// Collaborators shared by the Billing handlers.
#[derive(Clone)]
pub struct BillingContext {
    /// Source of timestamps.
    pub clock: Arc<dyn Clock>,
    /// Source of entity identifiers.
    pub ids: Arc<dyn IdGenerator>,
    /// Cashier storage.
    pub cashiers: Arc<dyn Repository<Cashier>>,
    /// Invoice storage.
    pub invoices: Arc<dyn Repository<Invoice>>,
    /// Dispatcher on the broker shared with other services.
    pub integration: Dispatcher,
    /// Dispatcher on Billing's internal bus.
    pub internal: Dispatcher,
}

impl std::fmt::Debug for BillingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingContext")
            .field("integration", &self.integration)
            .field("internal", &self.internal)
            .finish_non_exhaustive()
    }
}

/// Loads a cashier owned by `tenant_id`.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the cashier does not exist or
/// belongs to another tenant.
pub(crate) async fn load_cashier(
    ctx: &BillingContext,
    tenant_id: Uuid,
    cashier_id: Uuid,
) -> Result<Cashier, DomainError> {
    ctx.cashiers
        .get(cashier_id)
        .await?
        .filter(|cashier| cashier.tenant_id == tenant_id)
        .ok_or(DomainError::NotFound(cashier_id))
}

/// Loads an invoice owned by `tenant_id`.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the invoice does not exist or
/// belongs to another tenant.
pub(crate) async fn load_invoice(
    ctx: &BillingContext,
    tenant_id: Uuid,
    invoice_id: Uuid,
) -> Result<Invoice, DomainError> {
    ctx.invoices
        .get(invoice_id)
        .await?
        .filter(|invoice| invoice.tenant_id == tenant_id)
        .ok_or(DomainError::NotFound(invoice_id))
}

/// Handles the `CreateCashier` command and publishes `CashierCreated`.
///
/// # Errors
///
/// Returns `DomainError::Validation` for invalid contact details and
/// `DomainError::Publish` if the event cannot be published.
#[instrument(skip_all, fields(command_type = command.command_type(), correlation_id = %command.correlation_id()))]
pub async fn handle_create_cashier(
    command: &CreateCashier,
    ctx: &BillingContext,
    cancel: &CancellationToken,
) -> Result<Cashier, DomainError> {
    let cashier = Cashier::create(
        ctx.ids.next_id(),
        command.tenant_id,
        &command.name,
        &command.email,
        ctx.clock.now(),
    )?;
    ctx.cashiers.save(cashier.clone()).await?;

    ctx.integration
        .publish(
            &CashierCreated {
                tenant_id: cashier.tenant_id,
                cashier_id: cashier.id,
                name: cashier.name.clone(),
                email: cashier.email.clone(),
                occurred_at: cashier.created_at,
            },
            cancel,
        )
        .await?;

    info!(cashier_id = %cashier.id, "Cashier created");
    Ok(cashier)
}

/// Handles the `UpdateCashier` command and publishes `CashierUpdated`.
///
/// # Errors
///
/// Returns `DomainError::NotFound` for an unknown cashier,
/// `DomainError::Validation` for invalid contact details and
/// `DomainError::Publish` if the event cannot be published.
#[instrument(skip_all, fields(command_type = command.command_type(), correlation_id = %command.correlation_id()))]
pub async fn handle_update_cashier(
    command: &UpdateCashier,
    ctx: &BillingContext,
    cancel: &CancellationToken,
) -> Result<Cashier, DomainError> {
    let mut cashier = load_cashier(ctx, command.tenant_id, command.cashier_id).await?;
    cashier.update(&command.name, &command.email, ctx.clock.now())?;
    ctx.cashiers.save(cashier.clone()).await?;

    ctx.integration
        .publish(
            &CashierUpdated {
                tenant_id: cashier.tenant_id,
                cashier_id: cashier.id,
                name: cashier.name.clone(),
                email: cashier.email.clone(),
                occurred_at: cashier.updated_at,
            },
            cancel,
        )
        .await?;

    info!(cashier_id = %cashier.id, "Cashier updated");
    Ok(cashier)
}

/// Handles the `DeleteCashier` command and publishes `CashierDeleted`.
///
/// # Errors
///
/// Returns `DomainError::NotFound` for an unknown cashier,
/// `DomainError::InvalidState` if the cashier still has open invoices and
/// `DomainError::Publish` if the event cannot be published.
#[instrument(skip_all, fields(command_type = command.command_type(), correlation_id = %command.correlation_id()))]
pub async fn handle_delete_cashier(
    command: &DeleteCashier,
    ctx: &BillingContext,
    cancel: &CancellationToken,
) -> Result<(), DomainError> {
    let cashier = load_cashier(ctx, command.tenant_id, command.cashier_id).await?;

    let open_invoices = ctx
        .invoices
        .list_by_tenant(command.tenant_id)
        .await?
        .into_iter()
        .filter(|invoice| invoice.cashier_id == cashier.id && invoice.status == InvoiceStatus::Open)
        .count();
    if open_invoices > 0 {
        return Err(DomainError::InvalidState {
            entity_id: cashier.id,
            reason: format!("cashier has {open_invoices} open invoice(s)"),
        });
    }

    ctx.cashiers.delete(cashier.id).await?;
    ctx.integration
        .publish(
            &CashierDeleted {
                tenant_id: cashier.tenant_id,
                cashier_id: cashier.id,
                occurred_at: ctx.clock.now(),
            },
            cancel,
        )
        .await?;

    info!(cashier_id = %cashier.id, "Cashier deleted");
    Ok(())
}

/// Handles the `CreateInvoice` command and publishes `InvoiceCreated`.
///
/// # Errors
///
/// Returns `DomainError::NotFound` for an unknown cashier,
/// `DomainError::Validation` for an invalid amount or currency and
/// `DomainError::Publish` if the event cannot be published.
#[instrument(skip_all, fields(command_type = command.command_type(), correlation_id = %command.correlation_id()))]
pub async fn handle_create_invoice(
    command: &CreateInvoice,
    ctx: &BillingContext,
    cancel: &CancellationToken,
) -> Result<Invoice, DomainError> {
    let cashier = load_cashier(ctx, command.tenant_id, command.cashier_id).await?;
    let invoice = Invoice::create(
        ctx.ids.next_id(),
        command.tenant_id,
        cashier.id,
        &command.description,
        command.amount_cents,
        &command.currency,
        ctx.clock.now(),
    )?;
    ctx.invoices.save(invoice.clone()).await?;

    ctx.integration
        .publish(
            &InvoiceCreated {
                tenant_id: invoice.tenant_id,
                invoice_id: invoice.id,
                cashier_id: invoice.cashier_id,
                description: invoice.description.clone(),
                amount_cents: invoice.amount_cents,
                currency: invoice.currency.clone(),
                occurred_at: invoice.created_at,
            },
            cancel,
        )
        .await?;

    info!(invoice_id = %invoice.id, amount_cents = invoice.amount_cents, "Invoice created");
    Ok(invoice)
}

/// Handles the `PayInvoice` command and publishes `InvoicePaid`.
///
/// # Errors
///
/// Returns `DomainError::NotFound` for an unknown invoice,
/// `DomainError::InvalidState` unless the invoice is open,
/// `DomainError::Validation` if the amount does not match and
/// `DomainError::Publish` if the event cannot be published.
#[instrument(skip_all, fields(command_type = command.command_type(), correlation_id = %command.correlation_id()))]
pub async fn handle_pay_invoice(
    command: &PayInvoice,
    ctx: &BillingContext,
    cancel: &CancellationToken,
) -> Result<Invoice, DomainError> {
    let mut invoice = load_invoice(ctx, command.tenant_id, command.invoice_id).await?;
    let now = ctx.clock.now();
    invoice.pay(command.amount_cents, now)?;
    ctx.invoices.save(invoice.clone()).await?;

    ctx.integration
        .publish(
            &InvoicePaid {
                tenant_id: invoice.tenant_id,
                invoice_id: invoice.id,
                amount_cents: invoice.amount_cents,
                currency: invoice.currency.clone(),
                paid_at: now,
            },
            cancel,
        )
        .await?;

    info!(invoice_id = %invoice.id, "Invoice paid");
    Ok(invoice)
}

/// Handles the `CancelInvoice` command and publishes `InvoiceCancelled`.
///
/// # Errors
///
/// Returns `DomainError::NotFound` for an unknown invoice,
/// `DomainError::InvalidState` unless the invoice is open and
/// `DomainError::Publish` if the event cannot be published.
#[instrument(skip_all, fields(command_type = command.command_type(), correlation_id = %command.correlation_id()))]
pub async fn handle_cancel_invoice(
    command: &CancelInvoice,
    ctx: &BillingContext,
    cancel: &CancellationToken,
) -> Result<Invoice, DomainError> {
    let mut invoice = load_invoice(ctx, command.tenant_id, command.invoice_id).await?;
    let now = ctx.clock.now();
    invoice.cancel(now)?;
    ctx.invoices.save(invoice.clone()).await?;

    ctx.integration
        .publish(
            &InvoiceCancelled {
                tenant_id: invoice.tenant_id,
                invoice_id: invoice.id,
                reason: command.reason.trim().to_owned(),
                cancelled_at: now,
            },
            cancel,
        )
        .await?;

    info!(invoice_id = %invoice.id, "Invoice cancelled");
    Ok(invoice)
}

/// Handles the `AdjustInvoiceAmount` command and publishes
/// `InvoiceTotalsRecalculated` on the internal bus.
///
/// # Errors
///
/// Returns `DomainError::NotFound` for an unknown invoice,
/// `DomainError::InvalidState` unless the invoice is open,
/// `DomainError::Validation` for a non-positive amount and
/// `DomainError::Publish` if the event cannot be published.
#[instrument(skip_all, fields(command_type = command.command_type(), correlation_id = %command.correlation_id()))]
pub async fn handle_adjust_invoice_amount(
    command: &AdjustInvoiceAmount,
    ctx: &BillingContext,
    cancel: &CancellationToken,
) -> Result<Invoice, DomainError> {
    let mut invoice = load_invoice(ctx, command.tenant_id, command.invoice_id).await?;
    let previous_amount_cents = invoice.adjust_amount(command.amount_cents)?;
    ctx.invoices.save(invoice.clone()).await?;

    ctx.internal
        .publish(
            &InvoiceTotalsRecalculated {
                tenant_id: invoice.tenant_id,
                invoice_id: invoice.id,
                previous_amount_cents,
                amount_cents: invoice.amount_cents,
            },
            cancel,
        )
        .await?;

    info!(
        invoice_id = %invoice.id,
        previous_amount_cents,
        amount_cents = invoice.amount_cents,
        "Invoice amount adjusted"
    );
    Ok(invoice)
}
