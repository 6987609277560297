//! Application services for the Accounting context.

pub mod command_handlers;
pub mod event_handlers;
