//! Topic naming conventions.
//!
//! The convention is a wire-compatibility contract: every service sharing a
//! broker must derive the same topic for the same `(domain, entity)` pair.

use std::fmt;

/// Default delimiter between the domain and entity segments.
pub const DEFAULT_TOPIC_DELIMITER: char = '.';

/// Maps a `(domain, entity)` pair to a broker topic.
pub trait TopicNamingConvention: Send + Sync + fmt::Debug {
    /// Returns the topic for `entity` within `domain`.
    fn topic_for(&self, domain: &str, entity: &str) -> String;
}

/// Lowercase `domain<delimiter>entity`, e.g. `billing.cashier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimitedTopicConvention {
    delimiter: char,
}

impl DelimitedTopicConvention {
    /// Creates a convention joining segments with `delimiter`.
    #[must_use]
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    /// The delimiter between segments.
    #[must_use]
    pub fn delimiter(&self) -> char {
        self.delimiter
    }
}

impl Default for DelimitedTopicConvention {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_DELIMITER)
    }
}

impl TopicNamingConvention for DelimitedTopicConvention {
    fn topic_for(&self, domain: &str, entity: &str) -> String {
        format!(
            "{}{}{}",
            domain.trim().to_lowercase(),
            self.delimiter,
            entity.trim().to_lowercase()
        )
    }
}

/// Returns true if `topic` is non-empty and uses only `[a-z0-9._-]`.
#[must_use]
pub fn is_valid_topic(topic: &str) -> bool {
    !topic.is_empty()
        && topic
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_'))
}
