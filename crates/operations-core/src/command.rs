//! Commands accepted by the bounded contexts.

use uuid::Uuid;

/// A request to change state, executed on behalf of one tenant.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// Command name recorded on the handler span.
    fn command_type(&self) -> &'static str;

    /// Identifier linking the command to the events it causes.
    fn correlation_id(&self) -> Uuid;

    /// Tenant the command is executed for.
    fn tenant_id(&self) -> Uuid;
}
