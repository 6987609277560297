//! Query handlers for the Billing context.

use operations_core::error::DomainError;
use serde::Serialize;
use uuid::Uuid;

use crate::application::command_handlers::{BillingContext, load_cashier, load_invoice};
use crate::domain::entities::{Cashier, Invoice, InvoiceStatus};

/// Read-only view of a cashier and the invoices they issued.
#[derive(Debug, Serialize)]
pub struct CashierView {
    /// The cashier.
    #[serde(flatten)]
    pub cashier: Cashier,
    /// Number of invoices still open.
    pub open_invoices: usize,
}

/// Retrieves a cashier owned by `tenant_id`.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the cashier does not exist for the tenant.
pub async fn get_cashier(
    ctx: &BillingContext,
    tenant_id: Uuid,
    cashier_id: Uuid,
) -> Result<CashierView, DomainError> {
    let cashier = load_cashier(ctx, tenant_id, cashier_id).await?;
    let open_invoices = ctx
        .invoices
        .list_by_tenant(tenant_id)
        .await?
        .iter()
        .filter(|invoice| invoice.cashier_id == cashier_id && invoice.status == InvoiceStatus::Open)
        .count();
    Ok(CashierView {
        cashier,
        open_invoices,
    })
}

/// Retrieves an invoice owned by `tenant_id`.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the invoice does not exist for the tenant.
pub async fn get_invoice(
    ctx: &BillingContext,
    tenant_id: Uuid,
    invoice_id: Uuid,
) -> Result<Invoice, DomainError> {
    load_invoice(ctx, tenant_id, invoice_id).await
}

/// Lists a tenant's invoices with the given status, or all of them.
///
/// # Errors
///
/// Returns the repository's error if loading fails.
pub async fn list_invoices(
    ctx: &BillingContext,
    tenant_id: Uuid,
    status: Option<InvoiceStatus>,
) -> Result<Vec<Invoice>, DomainError> {
    Ok(ctx
        .invoices
        .list_by_tenant(tenant_id)
        .await?
        .into_iter()
        .filter(|invoice| status.is_none_or(|wanted| invoice.status == wanted))
        .collect())
}
