//! Wire contracts Accounting publishes and consumes.

pub mod billing;
pub mod integration_events;
