//! Partition key resolution.
//!
//! A partition key is the ordered list of an event's declared key fields,
//! each rendered in its stable string form and joined with
//! [`PARTITION_KEY_SEPARATOR`]. Equal field values always yield
//! byte-identical keys, whichever process computes them.

use std::any::Any;
use std::fmt;

use serde::Serialize;

use crate::descriptor::EventDescriptor;
use crate::error::PartitionKeyError;
use crate::event::Event;

/// Separator between key segments. Never produced by UUID, integer or
/// date renderings; rejected when found in any other value.
pub const PARTITION_KEY_SEPARATOR: char = '|';

/// A resolved composite partition key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PartitionKey(String);

impl PartitionKey {
    /// The key as sent to the broker.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the key, returning the wire string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// The individual segments in resolution order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(PARTITION_KEY_SEPARATOR)
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves the partition key of `event` from its descriptor.
///
/// Returns `Ok(None)` when the event declares no partition-key fields; the
/// broker then applies its own partitioning.
///
/// # Errors
///
/// Returns `PartitionKeyError::SeparatorInValue` if a value contains the
/// separator, and `PartitionKeyError::DescriptorMismatch` if `descriptor`
/// was built for another type.
pub fn resolve_partition_key<E: Event>(
    event: &E,
    descriptor: &EventDescriptor,
) -> Result<Option<PartitionKey>, PartitionKeyError> {
    let fields = descriptor.partition_key_fields();
    if fields.is_empty() {
        return Ok(None);
    }

    let event: &dyn Any = event;
    let mut segments = Vec::with_capacity(fields.len());
    for field in fields {
        let value = field
            .read(event)
            .ok_or(PartitionKeyError::DescriptorMismatch {
                event_type: E::EVENT_TYPE,
                descriptor: descriptor.event_type(),
            })?;
        if value.contains(PARTITION_KEY_SEPARATOR) {
            return Err(PartitionKeyError::SeparatorInValue {
                event_type: E::EVENT_TYPE,
                field: field.name(),
                value,
            });
        }
        segments.push(value);
    }

    Ok(Some(PartitionKey(
        segments.join(&PARTITION_KEY_SEPARATOR.to_string()),
    )))
}
