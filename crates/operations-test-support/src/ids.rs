//! Test identifiers: a predictable `IdGenerator`.

use std::sync::atomic::{AtomicU64, Ordering};

use operations_core::ids::IdGenerator;
use uuid::Uuid;

/// Returns `00000000-0000-0000-0000-000000000001`, `...0002` and so on.
#[derive(Debug, Default)]
pub struct SequenceIds {
    next: AtomicU64,
}

impl SequenceIds {
    /// Creates a generator whose first id ends in `1`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The `n`th id this generator returns, counting from 1.
    #[must_use]
    pub fn nth(n: u64) -> Uuid {
        Uuid::from_u128(u128::from(n))
    }
}

impl IdGenerator for SequenceIds {
    fn next_id(&self) -> Uuid {
        Self::nth(self.next.fetch_add(1, Ordering::Relaxed) + 1)
    }
}
