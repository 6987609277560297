//! End-to-end flow through the host: Billing publishes, Accounting books.

mod common;

use operations_accounting::domain::entities::RECEIVABLES_LEDGER_NAME;
use operations_billing::application::command_handlers::{
    handle_adjust_invoice_amount, handle_create_cashier, handle_create_invoice, handle_pay_invoice,
};
use operations_billing::domain::commands::{
    AdjustInvoiceAmount, CreateCashier, CreateInvoice, PayInvoice,
};
use operations_core::repository::Repository;
use uuid::Uuid;

#[tokio::test]
async fn test_paid_invoice_reaches_accounting_ledger() {
    // Arrange
    let host = common::start_host(&[("MESSAGING_PARTITIONS", "4")]).await;
    let billing = host.billing();
    let cancel = host.cancellation();
    let tenant_id = Uuid::new_v4();
    let cashier = handle_create_cashier(
        &CreateCashier {
            correlation_id: Uuid::new_v4(),
            tenant_id,
            name: "Ada".to_owned(),
            email: "ada@example.com".to_owned(),
        },
        billing,
        cancel,
    )
    .await
    .unwrap();
    let invoice = handle_create_invoice(
        &CreateInvoice {
            correlation_id: Uuid::new_v4(),
            tenant_id,
            cashier_id: cashier.id,
            description: "Audit".to_owned(),
            amount_cents: 9_000,
            currency: "EUR".to_owned(),
        },
        billing,
        cancel,
    )
    .await
    .unwrap();

    // Act
    handle_adjust_invoice_amount(
        &AdjustInvoiceAmount {
            correlation_id: Uuid::new_v4(),
            tenant_id,
            invoice_id: invoice.id,
            amount_cents: 8_000,
        },
        billing,
        cancel,
    )
    .await
    .unwrap();
    handle_pay_invoice(
        &PayInvoice {
            correlation_id: Uuid::new_v4(),
            tenant_id,
            invoice_id: invoice.id,
            amount_cents: 8_000,
        },
        billing,
        cancel,
    )
    .await
    .unwrap();
    host.billing_bus().drain().await;
    host.broker().drain().await;

    // Assert
    assert_eq!(host.invoice_totals().amount_for(invoice.id), Some(8_000));
    let ledgers = host
        .accounting()
        .ledgers
        .list_by_tenant(tenant_id)
        .await
        .unwrap();
    assert_eq!(ledgers.len(), 1);
    assert_eq!(ledgers[0].name, RECEIVABLES_LEDGER_NAME);
    assert_eq!(ledgers[0].balance_cents, 8_000);
    let entries = host
        .accounting()
        .entries
        .list_by_tenant(tenant_id)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].invoice_id, Some(invoice.id));
    assert!(!host.broker().is_recording());
    assert!(host.broker().sent().is_empty());
}
