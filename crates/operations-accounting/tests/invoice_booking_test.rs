use std::sync::Arc;

use operations_accounting::application::command_handlers::AccountingContext;
use operations_accounting::application::event_handlers::{InvoicePaidHandler, register_consumers};
use operations_accounting::domain::entities::RECEIVABLES_LEDGER_NAME;
use operations_billing::application::command_handlers::{
    BillingContext, handle_create_cashier, handle_create_invoice, handle_pay_invoice,
};
use operations_billing::domain::commands::{CreateCashier, CreateInvoice, PayInvoice};
use operations_core::repository::{InMemoryRepository, Repository};
use operations_messaging::{
    CloudEventEnvelope, Dispatcher, EnvelopeWrapper, EventRegistry, InMemoryBroker, Transport,
};
use operations_test_support::{FixedClock, SequenceIds};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn wrapper(source: &str) -> EnvelopeWrapper {
    EnvelopeWrapper::new(
        source,
        Arc::new(FixedClock::reference()),
        Arc::new(SequenceIds::new()),
    )
}

fn billing(broker: &Arc<InMemoryBroker>) -> BillingContext {
    let registry = Arc::new(EventRegistry::new());
    operations_billing::register_events(&registry).unwrap();
    BillingContext {
        clock: Arc::new(FixedClock::reference()),
        ids: Arc::new(SequenceIds::new()),
        cashiers: Arc::new(InMemoryRepository::new()),
        invoices: Arc::new(InMemoryRepository::new()),
        integration: Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(broker) as Arc<dyn Transport>,
            wrapper("urn:operations:billing"),
        ),
        internal: Dispatcher::new(
            registry,
            Arc::new(InMemoryBroker::internal()) as Arc<dyn Transport>,
            wrapper("urn:operations:billing"),
        ),
    }
}

fn accounting(broker: &Arc<InMemoryBroker>) -> AccountingContext {
    let registry = Arc::new(EventRegistry::new());
    operations_accounting::register_events(&registry).unwrap();
    AccountingContext {
        clock: Arc::new(FixedClock::reference()),
        ids: Arc::new(SequenceIds::new()),
        ledgers: Arc::new(InMemoryRepository::new()),
        entries: Arc::new(InMemoryRepository::new()),
        integration: Dispatcher::new(
            registry,
            Arc::clone(broker) as Arc<dyn Transport>,
            wrapper("urn:operations:accounting"),
        ),
    }
}

async fn pay_invoice(ctx: &BillingContext, tenant_id: Uuid, amount_cents: i64) -> Uuid {
    let cancel = CancellationToken::new();
    let cashier = handle_create_cashier(
        &CreateCashier {
            correlation_id: Uuid::new_v4(),
            tenant_id,
            name: "Grace".to_owned(),
            email: format!("grace+{amount_cents}@example.com"),
        },
        ctx,
        &cancel,
    )
    .await
    .unwrap();
    let invoice = handle_create_invoice(
        &CreateInvoice {
            correlation_id: Uuid::new_v4(),
            tenant_id,
            cashier_id: cashier.id,
            description: "Support plan".to_owned(),
            amount_cents,
            currency: "EUR".to_owned(),
        },
        ctx,
        &cancel,
    )
    .await
    .unwrap();
    handle_pay_invoice(
        &PayInvoice {
            correlation_id: Uuid::new_v4(),
            tenant_id,
            invoice_id: invoice.id,
            amount_cents,
        },
        ctx,
        &cancel,
    )
    .await
    .unwrap();
    invoice.id
}

#[tokio::test]
async fn test_paid_invoice_is_booked_by_accounting() {
    // Arrange
    let broker = Arc::new(InMemoryBroker::external());
    let billing = billing(&broker);
    let accounting = accounting(&broker);
    let cancel = CancellationToken::new();
    register_consumers(
        &accounting.integration,
        InvoicePaidHandler::new(accounting.clone(), cancel.clone()),
    )
    .unwrap();
    let topics = accounting.integration.subscribe(&cancel).await.unwrap();
    let tenant_id = Uuid::new_v4();

    // Act
    let invoice_id = pay_invoice(&billing, tenant_id, 12_500).await;
    broker.drain().await;

    // Assert
    assert_eq!(topics, ["billing.invoice"]);
    let ledgers = accounting.ledgers.list_by_tenant(tenant_id).await.unwrap();
    assert_eq!(ledgers.len(), 1);
    assert_eq!(ledgers[0].name, RECEIVABLES_LEDGER_NAME);
    assert_eq!(ledgers[0].balance_cents, 12_500);
    let entries = accounting.entries.list_by_tenant(tenant_id).await.unwrap();
    assert_eq!(entries[0].invoice_id, Some(invoice_id));

    let recorded = broker.sent_to("accounting.ledger");
    assert_eq!(recorded.len(), 2);
    let envelope = CloudEventEnvelope::from_slice(&recorded[1].message.payload).unwrap();
    assert_eq!(envelope.event_type, "LedgerEntryRecorded");
    assert_eq!(envelope.source, "urn:operations:accounting");
    assert_eq!(envelope.data["invoice_id"], invoice_id.to_string());
}

#[tokio::test]
async fn test_payments_of_one_tenant_accumulate() {
    let broker = Arc::new(InMemoryBroker::external());
    let billing = billing(&broker);
    let accounting = accounting(&broker);
    let cancel = CancellationToken::new();
    register_consumers(
        &accounting.integration,
        InvoicePaidHandler::new(accounting.clone(), cancel.clone()),
    )
    .unwrap();
    accounting.integration.subscribe(&cancel).await.unwrap();
    let tenant_id = Uuid::new_v4();

    pay_invoice(&billing, tenant_id, 1_000).await;
    pay_invoice(&billing, tenant_id, 4_000).await;
    broker.drain().await;

    let ledgers = accounting.ledgers.list_by_tenant(tenant_id).await.unwrap();
    assert_eq!(ledgers.len(), 1);
    assert_eq!(ledgers[0].balance_cents, 5_000);
    assert_eq!(
        accounting.entries.list_by_tenant(tenant_id).await.unwrap().len(),
        2
    );
}
