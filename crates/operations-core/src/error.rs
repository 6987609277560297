//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type shared by the bounded contexts.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An entity was not found.
    #[error("entity not found: {0}")]
    NotFound(Uuid),

    /// The entity is in a state that does not allow the operation.
    #[error("invalid state for {entity_id}: {reason}")]
    InvalidState {
        /// The entity that rejected the operation.
        entity_id: Uuid,
        /// Why the operation was rejected.
        reason: String,
    },

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An integration event could not be handed to the message transport.
    #[error("publish error: {0}")]
    Publish(String),
}
