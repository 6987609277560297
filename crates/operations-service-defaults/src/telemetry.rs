//! Tracing subscriber setup.

use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Installs a JSON `fmt` subscriber filtered by `RUST_LOG`.
///
/// If a global subscriber is already installed it is kept, and the refusal
/// is logged through it.
pub fn init() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .json()
        .try_init();
    if let Err(e) = installed {
        warn!(error = %e, "Tracing subscriber already installed, keeping it");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_keeps_installed_subscriber() {
        init();

        init();

        assert!(tracing::dispatcher::has_been_set());
    }
}
