//! Billing events as Accounting understands them.

pub mod integration_events;
