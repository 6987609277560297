//! Domain model for the Billing context.

pub mod commands;
pub mod entities;
pub mod events;
