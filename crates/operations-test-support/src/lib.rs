//! Shared test doubles for the Operations services.

mod clock;
mod handler;
mod ids;
mod transport;

pub use clock::FixedClock;
pub use handler::{FailingHandler, RecordingHandler};
pub use ids::SequenceIds;
pub use transport::{FailingTransport, RecordingTransport};
