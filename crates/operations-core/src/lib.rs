//! Operations Core: shared domain abstractions.
//!
//! This crate defines the traits and types that the Billing and Accounting
//! services depend on. Storage beyond an in-process map lives elsewhere.

pub mod clock;
pub mod command;
pub mod error;
pub mod ids;
pub mod repository;
