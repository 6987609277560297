//! Command handlers for the Accounting context.

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

use crate::contracts::integration_events::{LedgerCreated, LedgerEntryRecorded};
use crate::domain::commands::{CreateLedger, RecordLedgerEntry};
use crate::domain::entities::{Ledger, LedgerEntry};

/// Collaborators shared by the Accounting handlers.
#[derive(Clone)]
pub struct AccountingContext {
    /// Source of timestamps.
    pub clock: Arc<dyn Clock>,
    /// Source of entity identifiers.
    pub ids: Arc<dyn IdGenerator>,
    /// Ledger storage.
    pub ledgers: Arc<dyn Repository<Ledger>>,
    /// Ledger entry storage.
    pub entries: Arc<dyn Repository<LedgerEntry>>,
    /// Dispatcher on the broker shared with other services.
    pub integration: Dispatcher,
}

impl std::fmt::Debug for AccountingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountingContext")
            .field("integration", &self.integration)
            .finish_non_exhaustive()
    }
}

/// Finds a tenant's ledger by name and currency.
///
/// # Errors
///
/// Returns the repository's error if loading fails.
pub async fn find_ledger(
    ctx: &AccountingContext,
    tenant_id: Uuid,
    name: &str,
    currency: &str,
) -> Result<Option<Ledger>, DomainError> {
    Ok(ctx
        .ledgers
        .list_by_tenant(tenant_id)
        .await?
        .into_iter()
        .find(|ledger| {
            ledger.name.eq_ignore_ascii_case(name.trim())
                && ledger.currency.eq_ignore_ascii_case(currency.trim())
        }))
}

/// Handles the `CreateLedger` command and publishes `LedgerCreated`.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an invalid name or currency or a
/// name already used for that currency, and `DomainError::Publish` if the
/// event cannot be published.
#[instrument(skip_all, fields(command_type = command.command_type(), correlation_id = %command.correlation_id()))]
pub async fn handle_create_ledger(
    command: &CreateLedger,
    ctx: &AccountingContext,
    cancel: &CancellationToken,
) -> Result<Ledger, DomainError> {
    let ledger = Ledger::open(
        ctx.ids.next_id(),
        command.tenant_id,
        &command.name,
        &command.currency,
        ctx.clock.now(),
    )?;
    if find_ledger(ctx, ledger.tenant_id, &ledger.name, &ledger.currency)
        .await?
        .is_some()
    {
        return Err(DomainError::Validation(format!(
            "ledger '{}' in {} already exists",
            ledger.name, ledger.currency
        )));
    }
    ctx.ledgers.save(ledger.clone()).await?;

    ctx.integration
        .publish(
            &LedgerCreated {
                tenant_id: ledger.tenant_id,
                ledger_id: ledger.id,
                name: ledger.name.clone(),
                currency: ledger.currency.clone(),
                occurred_at: ledger.created_at,
            },
            cancel,
        )
        .await?;

    info!(ledger_id = %ledger.id, currency = %ledger.currency, "Ledger created");
    Ok(ledger)
}

/// Handles the `RecordLedgerEntry` command and publishes
/// `LedgerEntryRecorded`.
///
/// # Errors
///
/// Returns `DomainError::NotFound` for an unknown ledger,
/// `DomainError::Validation` or `DomainError::InvalidState` if the ledger
/// rejects the entry and `DomainError::Publish` if the event cannot be
/// published.
#[instrument(skip_all, fields(command_type = command.command_type(), correlation_id = %command.correlation_id()))]
pub async fn handle_record_entry(
    command: &RecordLedgerEntry,
    ctx: &AccountingContext,
    cancel: &CancellationToken,
) -> Result<LedgerEntry, DomainError> {
    let mut ledger = ctx
        .ledgers
        .get(command.ledger_id)
        .await?
        .filter(|ledger| ledger.tenant_id == command.tenant_id)
        .ok_or(DomainError::NotFound(command.ledger_id))?;

    let entry = ledger.record(
        ctx.ids.next_id(),
        command.amount_cents,
        &command.currency,
        command.invoice_id,
        &command.description,
        ctx.clock.now(),
    )?;
    ctx.entries.save(entry.clone()).await?;
    ctx.ledgers.save(ledger.clone()).await?;

    ctx.integration
        .publish(
            &LedgerEntryRecorded {
                tenant_id: entry.tenant_id,
                ledger_id: entry.ledger_id,
                entry_id: entry.id,
                amount_cents: entry.amount_cents,
                currency: entry.currency.clone(),
                invoice_id: entry.invoice_id,
                balance_cents: ledger.balance_cents,
                recorded_at: entry.recorded_at,
            },
            cancel,
        )
        .await?;

    info!(
        ledger_id = %ledger.id,
        entry_id = %entry.id,
        amount_cents = entry.amount_cents,
        balance_cents = ledger.balance_cents,
        "Ledger entry recorded"
    );
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use operations_core::repository::InMemoryRepository;
    use operations_messaging::{CloudEventEnvelope, EnvelopeWrapper, EventRegistry, Transport};
    use operations_test_support::{FixedClock, RecordingTransport, SequenceIds};

    use super::*;

    fn context(transport: Arc<RecordingTransport>) -> AccountingContext {
        AccountingContext {
            clock: Arc::new(FixedClock::reference()),
            ids: Arc::new(SequenceIds::new()),
            ledgers: Arc::new(InMemoryRepository::new()),
            entries: Arc::new(InMemoryRepository::new()),
            integration: Dispatcher::new(
                Arc::new(EventRegistry::new()),
                transport as Arc<dyn Transport>,
                EnvelopeWrapper::new(
                    "urn:operations:accounting",
                    Arc::new(FixedClock::reference()),
                    Arc::new(SequenceIds::new()),
                ),
            ),
        }
    }

    fn create_command(tenant_id: Uuid) -> CreateLedger {
        CreateLedger {
            correlation_id: Uuid::new_v4(),
            tenant_id,
            name: "Operating".to_owned(),
            currency: "EUR".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_create_ledger_publishes_ledger_created() {
        // Arrange
        let transport = Arc::new(RecordingTransport::external());
        let ctx = context(Arc::clone(&transport));
        let tenant_id = Uuid::new_v4();

        // Act
        let ledger = handle_create_ledger(&create_command(tenant_id), &ctx, &CancellationToken::new())
            .await
            .unwrap();

        // Assert
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].topic, "accounting.ledger");
        assert_eq!(sent[0].partition_key, Some(format!("{tenant_id}|{}", ledger.id)));
        let envelope = CloudEventEnvelope::from_slice(&sent[0].payload).unwrap();
        assert_eq!(envelope.event_type, "LedgerCreated");
        assert_eq!(envelope.source, "urn:operations:accounting");
    }

    #[tokio::test]
    async fn test_duplicate_ledger_name_is_rejected() {
        let transport = Arc::new(RecordingTransport::external());
        let ctx = context(Arc::clone(&transport));
        let tenant_id = Uuid::new_v4();
        handle_create_ledger(&create_command(tenant_id), &ctx, &CancellationToken::new())
            .await
            .unwrap();

        let result =
            handle_create_ledger(&create_command(tenant_id), &ctx, &CancellationToken::new()).await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_record_entry_updates_balance_and_publishes() {
        let transport = Arc::new(RecordingTransport::external());
        let ctx = context(Arc::clone(&transport));
        let tenant_id = Uuid::new_v4();
        let ledger = handle_create_ledger(&create_command(tenant_id), &ctx, &CancellationToken::new())
            .await
            .unwrap();

        let entry = handle_record_entry(
            &RecordLedgerEntry {
                correlation_id: Uuid::new_v4(),
                tenant_id,
                ledger_id: ledger.id,
                amount_cents: 4_200,
                currency: "EUR".to_owned(),
                invoice_id: None,
                description: "Opening balance".to_owned(),
            },
            &ctx,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let stored = ctx.ledgers.get(ledger.id).await.unwrap().unwrap();
        assert_eq!(stored.balance_cents, 4_200);
        assert_eq!(ctx.entries.get(entry.id).await.unwrap(), Some(entry));
        let recorded = CloudEventEnvelope::from_slice(&transport.sent()[1].payload).unwrap();
        assert_eq!(recorded.event_type, "LedgerEntryRecorded");
        assert_eq!(recorded.data["balance_cents"], 4_200);
    }

    #[tokio::test]
    async fn test_record_entry_on_unknown_ledger_is_not_found() {
        let ctx = context(Arc::new(RecordingTransport::external()));

        let result = handle_record_entry(
            &RecordLedgerEntry {
                correlation_id: Uuid::new_v4(),
                tenant_id: Uuid::new_v4(),
                ledger_id: Uuid::new_v4(),
                amount_cents: 1,
                currency: "EUR".to_owned(),
                invoice_id: None,
                description: String::new(),
            },
            &ctx,
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }
}
