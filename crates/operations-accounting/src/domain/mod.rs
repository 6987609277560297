//! Domain model for the Accounting context.

pub mod commands;
pub mod entities;
