//! Wire contracts Billing shares with other services.

pub mod integration_events;
