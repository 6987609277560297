//! HTTP routes exposed by the host.

pub mod health;
pub mod messaging;
