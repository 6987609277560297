//! Wiring of the Operations services into one process.
//!
//! Billing and Accounting each get their own registry and dispatchers and
//! share one external in-memory broker. Billing additionally owns an
//! internal bus for events that never leave the service.

use std::sync::Arc;

use operations_accounting::application::command_handlers::AccountingContext;
use operations_accounting::application::event_handlers::{InvoicePaidHandler, register_consumers};
use operations_billing::application::command_handlers::BillingContext;
use operations_billing::application::event_handlers::{InvoiceTotals, register_internal_handlers};
use operations_core::clock::{Clock, SystemClock};
use operations_core::ids::{IdGenerator, TimeOrderedIds};
use operations_core::repository::InMemoryRepository;
use operations_messaging::{
    DelimitedTopicConvention, Dispatcher, EnvelopeWrapper, EventRegistry, InMemoryBroker,
    Transport, TransportScope,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ServiceConfig;
use crate::error::AppError;

/// A service running in the host, as seen by the topology endpoint.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    /// Domain name of the service.
    pub name: &'static str,
    /// Envelope `source` of the service's integration events.
    pub source: String,
    /// The service's event registry.
    pub registry: Arc<EventRegistry>,
    /// Topics the service consumes, across all of its buses.
    pub subscriptions: Vec<String>,
}

/// Both services and the brokers connecting them.
#[derive(Debug)]
pub struct Host {
    config: ServiceConfig,
    broker: Arc<InMemoryBroker>,
    billing_bus: Arc<InMemoryBroker>,
    billing: BillingContext,
    billing_source: String,
    invoice_totals: InvoiceTotals,
    accounting: AccountingContext,
    accounting_source: String,
    cancel: CancellationToken,
}

impl Host {
    /// Builds both services and registers their published events.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Declaration` if an event declaration is malformed.
    pub fn build(config: ServiceConfig, cancel: CancellationToken) -> Result<Self, AppError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let ids: Arc<dyn IdGenerator> = Arc::new(TimeOrderedIds);
        let broker = Arc::new(InMemoryBroker::new(TransportScope::External, config.partitions));
        let billing_bus = Arc::new(InMemoryBroker::new(TransportScope::Internal, config.partitions));

        let billing_source = format!("{}/{}", config.messaging_source, operations_billing::DOMAIN);
        let billing_registry = registry(&config);
        operations_billing::register_events(&billing_registry)?;
        let billing_wrapper =
            EnvelopeWrapper::new(billing_source.clone(), Arc::clone(&clock), Arc::clone(&ids));
        let billing = BillingContext {
            clock: Arc::clone(&clock),
            ids: Arc::clone(&ids),
            cashiers: Arc::new(InMemoryRepository::new()),
            invoices: Arc::new(InMemoryRepository::new()),
            integration: Dispatcher::new(
                Arc::clone(&billing_registry),
                Arc::clone(&broker) as Arc<dyn Transport>,
                billing_wrapper.clone(),
            ),
            internal: Dispatcher::new(
                billing_registry,
                Arc::clone(&billing_bus) as Arc<dyn Transport>,
                billing_wrapper,
            ),
        };

        let accounting_source =
            format!("{}/{}", config.messaging_source, operations_accounting::DOMAIN);
        let accounting_registry = registry(&config);
        operations_accounting::register_events(&accounting_registry)?;
        let accounting = AccountingContext {
            clock: Arc::clone(&clock),
            ids: Arc::clone(&ids),
            ledgers: Arc::new(InMemoryRepository::new()),
            entries: Arc::new(InMemoryRepository::new()),
            integration: Dispatcher::new(
                accounting_registry,
                Arc::clone(&broker) as Arc<dyn Transport>,
                EnvelopeWrapper::new(accounting_source.clone(), clock, ids),
            ),
        };

        Ok(Self {
            config,
            broker,
            billing_bus,
            billing,
            billing_source,
            invoice_totals: InvoiceTotals::new(),
            accounting,
            accounting_source,
            cancel,
        })
    }

    /// Registers every consumer and subscribes it to its topics.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Messaging` if a handler cannot be registered or
    /// subscribed, and `AppError::Declaration` if unique topics are enforced
    /// and two entities share a topic.
    pub async fn start(&self) -> Result<(), AppError> {
        register_internal_handlers(&self.billing.internal, self.invoice_totals.clone())?;
        register_consumers(
            &self.accounting.integration,
            InvoicePaidHandler::new(self.accounting.clone(), self.cancel.clone()),
        )?;

        if self.config.enforce_unique_topics {
            self.billing.integration.registry().ensure_unique_topics()?;
            self.accounting.integration.registry().ensure_unique_topics()?;
        }

        let internal = self.billing.internal.subscribe(&self.cancel).await?;
        let consumed = self.accounting.integration.subscribe(&self.cancel).await?;
        info!(
            billing_internal = ?internal,
            accounting = ?consumed,
            partitions = self.config.partitions.get(),
            "Services subscribed"
        );
        Ok(())
    }

    /// Host configuration.
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The broker shared by all services.
    #[must_use]
    pub fn broker(&self) -> &Arc<InMemoryBroker> {
        &self.broker
    }

    /// Billing's internal bus.
    #[must_use]
    pub fn billing_bus(&self) -> &Arc<InMemoryBroker> {
        &self.billing_bus
    }

    /// Billing's handler collaborators.
    #[must_use]
    pub fn billing(&self) -> &BillingContext {
        &self.billing
    }

    /// Billing's invoice totals projection.
    #[must_use]
    pub fn invoice_totals(&self) -> &InvoiceTotals {
        &self.invoice_totals
    }

    /// Accounting's handler collaborators.
    #[must_use]
    pub fn accounting(&self) -> &AccountingContext {
        &self.accounting
    }

    /// Token cancelling every in-flight publish and dispatch.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The services in the host, sorted by name.
    #[must_use]
    pub fn services(&self) -> Vec<ServiceInfo> {
        let mut billing_topics = self.billing.integration.handled_topics();
        billing_topics.extend(self.billing.internal.handled_topics());
        billing_topics.sort();
        billing_topics.dedup();

        vec![
            ServiceInfo {
                name: operations_accounting::DOMAIN,
                source: self.accounting_source.clone(),
                registry: Arc::clone(self.accounting.integration.registry()),
                subscriptions: self.accounting.integration.handled_topics(),
            },
            ServiceInfo {
                name: operations_billing::DOMAIN,
                source: self.billing_source.clone(),
                registry: Arc::clone(self.billing.integration.registry()),
                subscriptions: billing_topics,
            },
        ]
    }
}

fn registry(config: &ServiceConfig) -> Arc<EventRegistry> {
    Arc::new(EventRegistry::with_convention(Arc::new(
        DelimitedTopicConvention::new(config.topic_delimiter),
    )))
}
