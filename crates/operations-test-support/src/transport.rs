//! Test transports: mock `Transport` implementations for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use operations_messaging::{
    DispatchOutcome, InboundHandler, InboundMessage, Transport, TransportError, TransportMessage,
    TransportScope,
};

/// A transport that records every sent message and subscription and
/// delivers only when asked to via [`RecordingTransport::deliver_sent`].
pub struct RecordingTransport {
    scope: TransportScope,
    sent: Mutex<Vec<TransportMessage>>,
    subscribers: Mutex<HashMap<String, Vec<Arc<dyn InboundHandler>>>>,
}

impl std::fmt::Debug for RecordingTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingTransport")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl RecordingTransport {
    /// Creates a recording transport with the given scope.
    #[must_use]
    pub fn new(scope: TransportScope) -> Self {
        Self {
            scope,
            sent: Mutex::new(Vec::new()),
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// A recording transport shared between services.
    #[must_use]
    pub fn external() -> Self {
        Self::new(TransportScope::External)
    }

    /// A recording transport private to one service.
    #[must_use]
    pub fn internal() -> Self {
        Self::new(TransportScope::Internal)
    }

    /// Returns a snapshot of all sent messages.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn sent(&self) -> Vec<TransportMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Topics subscribed to, sorted.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn subscribed_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.subscribers.lock().unwrap().keys().cloned().collect();
        topics.sort();
        topics
    }

    /// Delivers every message sent so far to the subscribers of its topic,
    /// in send order, and returns the outcomes.
    ///
    /// # Panics
    ///
    /// Panics if an internal mutex is poisoned.
    pub async fn deliver_sent(&self) -> Vec<DispatchOutcome> {
        let mut outcomes = Vec::new();
        for message in self.sent() {
            let handlers = self
                .subscribers
                .lock()
                .unwrap()
                .get(&message.topic)
                .cloned()
                .unwrap_or_default();
            for handler in handlers {
                outcomes.push(handler.on_message(InboundMessage::from(message.clone())).await);
            }
        }
        outcomes
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn scope(&self) -> TransportScope {
        self.scope
    }

    async fn send(&self, message: TransportMessage) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn InboundHandler>,
    ) -> Result<(), TransportError> {
        self.subscribers
            .lock()
            .unwrap()
            .entry(topic.to_owned())
            .or_default()
            .push(handler);
        Ok(())
    }
}

/// A transport whose sends and subscriptions always fail. Useful for
/// testing error propagation.
#[derive(Debug)]
pub struct FailingTransport;

impl FailingTransport {
    /// Cause reported by every failure.
    pub const CAUSE: &'static str = "broker unavailable";
}

#[async_trait]
impl Transport for FailingTransport {
    fn scope(&self) -> TransportScope {
        TransportScope::External
    }

    async fn send(&self, message: TransportMessage) -> Result<(), TransportError> {
        Err(TransportError::SendFailed {
            topic: message.topic,
            cause: Self::CAUSE.to_owned(),
        })
    }

    async fn subscribe(
        &self,
        topic: &str,
        _handler: Arc<dyn InboundHandler>,
    ) -> Result<(), TransportError> {
        Err(TransportError::SubscribeFailed {
            topic: topic.to_owned(),
            cause: Self::CAUSE.to_owned(),
        })
    }
}
