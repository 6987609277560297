//! Test handlers: `EventHandler` implementations that record or fail.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use operations_messaging::{Event, EventHandler, HandlerError};
use tokio::sync::Notify;

/// Records every event it handles. Clones share the same record.
#[derive(Debug)]
pub struct RecordingHandler<E> {
    received: Arc<Mutex<Vec<E>>>,
    notify: Arc<Notify>,
}

impl<E> Clone for RecordingHandler<E> {
    fn clone(&self) -> Self {
        Self {
            received: Arc::clone(&self.received),
            notify: Arc::clone(&self.notify),
        }
    }
}

impl<E> Default for RecordingHandler<E> {
    fn default() -> Self {
        Self {
            received: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
        }
    }
}

impl<E: Clone> RecordingHandler<E> {
    /// Creates an empty recording handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the handled events, in handling order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn received(&self) -> Vec<E> {
        self.received.lock().unwrap().clone()
    }

    /// Waits until at least `count` events were handled or `timeout`
    /// elapses. Returns whether the count was reached.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let reached = async {
            loop {
                let notified = self.notify.notified();
                if self.received.lock().unwrap().len() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, reached).await.is_ok()
    }
}

#[async_trait]
impl<E: Event + Clone> EventHandler<E> for RecordingHandler<E> {
    async fn handle(&self, event: E) -> Result<(), HandlerError> {
        self.received.lock().unwrap().push(event);
        self.notify.notify_waiters();
        Ok(())
    }
}

/// A handler that rejects every event with the same error message.
#[derive(Debug, Clone)]
pub struct FailingHandler {
    reason: &'static str,
}

impl FailingHandler {
    /// Creates a handler failing with `reason`.
    #[must_use]
    pub fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

#[async_trait]
impl<E: Event> EventHandler<E> for FailingHandler {
    async fn handle(&self, _event: E) -> Result<(), HandlerError> {
        Err(self.reason.into())
    }
}
