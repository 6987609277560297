//! Shared application state.

use std::sync::Arc;

use crate::host::Host;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The running services.
    pub host: Arc<Host>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(host: Arc<Host>) -> Self {
        Self { host }
    }
}
