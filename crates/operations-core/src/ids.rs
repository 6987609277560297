//! Identifier generation abstraction for determinism.
//!
//! In production, identifiers are time-ordered UUIDv7 values. In tests,
//! a predetermined sequence is injected.

use uuid::Uuid;

/// Abstraction over unique identifier generation.
pub trait IdGenerator: Send + Sync {
    /// Returns a new identifier. Successive identifiers sort by creation time.
    fn next_id(&self) -> Uuid;
}

/// Production generator producing UUIDv7 identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeOrderedIds;

impl IdGenerator for TimeOrderedIds {
    fn next_id(&self) -> Uuid {
        Uuid::now_v7()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_ordered_ids_are_version_7() {
        let id = TimeOrderedIds.next_id();
        assert_eq!(id.get_version_num(), 7);
    }

    #[test]
    fn test_time_ordered_ids_sort_by_creation() {
        let ids = TimeOrderedIds;
        let first = ids.next_id();
        let second = ids.next_id();
        assert!(first < second);
    }
}
