//! Handlers for events Billing receives on its internal bus.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use operations_messaging::{Dispatcher, EventHandler, HandlerError, MessagingError};
use tracing::debug;
use uuid::Uuid;

use crate::domain::events::InvoiceTotalsRecalculated;

/// Latest amount due per open invoice, fed by `InvoiceTotalsRecalculated`.
#[derive(Debug, Clone, Default)]
pub struct InvoiceTotals {
    amounts: Arc<RwLock<HashMap<Uuid, i64>>>,
}

impl InvoiceTotals {
    /// Creates an empty projection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The last recalculated amount for `invoice_id`.
    #[must_use]
    pub fn amount_for(&self, invoice_id: Uuid) -> Option<i64> {
        self.amounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&invoice_id)
            .copied()
    }
}

#[async_trait]
impl EventHandler<InvoiceTotalsRecalculated> for InvoiceTotals {
    async fn handle(&self, event: InvoiceTotalsRecalculated) -> Result<(), HandlerError> {
        self.amounts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(event.invoice_id, event.amount_cents);
        debug!(
            invoice_id = %event.invoice_id,
            amount_cents = event.amount_cents,
            "Invoice totals projection updated"
        );
        Ok(())
    }
}

/// Registers Billing's internal-bus handlers on `internal`.
///
/// # Errors
///
/// Returns `MessagingError::Declaration` if a handled event's declaration
/// is malformed.
pub fn register_internal_handlers(
    internal: &Dispatcher,
    totals: InvoiceTotals,
) -> Result<(), MessagingError> {
    internal.on::<InvoiceTotalsRecalculated, _>(totals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_projection_keeps_latest_amount() {
        let totals = InvoiceTotals::new();
        let invoice_id = Uuid::new_v4();

        for amount_cents in [12_500, 9_900] {
            totals
                .handle(InvoiceTotalsRecalculated {
                    tenant_id: Uuid::new_v4(),
                    invoice_id,
                    previous_amount_cents: 0,
                    amount_cents,
                })
                .await
                .unwrap();
        }

        assert_eq!(totals.amount_for(invoice_id), Some(9_900));
        assert_eq!(totals.amount_for(Uuid::new_v4()), None);
    }
}
