//! In-process partitioned broker.
//!
//! Each topic has a fixed number of partitions, each drained by one
//! sequential delivery task, so messages sharing a partition key are
//! delivered in publish order. Keyed messages go to
//! `sha256(key)[0..8] mod partitions`; unkeyed messages are spread
//! round-robin. Messages published before anyone subscribes to their topic
//! are not delivered. Brokers built with [`InMemoryBroker::recording`] also
//! keep a log of every accepted message for inspection.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::{Notify, RwLock, mpsc};
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::transport::{InboundHandler, InboundMessage, Transport, TransportMessage, TransportScope};

/// Partitions per topic unless configured otherwise.
pub const DEFAULT_PARTITION_COUNT: NonZeroU32 = NonZeroU32::new(8).expect("8 is non-zero");

/// Queued messages per partition before `send` waits.
const PARTITION_QUEUE_CAPACITY: usize = 1024;

/// Maps a partition key to a partition in `[0, partition_count)`.
///
/// The first eight bytes of the key's SHA-256 digest, read big-endian,
/// modulo the partition count. Stable across processes and platforms.
#[must_use]
pub fn partition_for_key(key: &str, partition_count: NonZeroU32) -> u32 {
    let digest = Sha256::digest(key.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let hash = u64::from_be_bytes(prefix) % u64::from(partition_count.get());
    u32::try_from(hash).unwrap_or_default()
}

/// One entry of the broker's send log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRecord {
    /// The message as handed to `send`.
    pub message: TransportMessage,
    /// Partition it was assigned to.
    pub partition: u32,
}

type Subscribers = Arc<RwLock<Vec<Arc<dyn InboundHandler>>>>;

struct TopicChannels {
    partitions: Vec<mpsc::Sender<InboundMessage>>,
    subscribers: Subscribers,
}

#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn begin(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    fn end(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Partitioned in-memory transport.
pub struct InMemoryBroker {
    scope: TransportScope,
    partition_count: NonZeroU32,
    topics: Mutex<HashMap<String, Arc<TopicChannels>>>,
    round_robin: AtomicU32,
    sent: Option<Mutex<Vec<SentRecord>>>,
    in_flight: Arc<InFlight>,
}

impl std::fmt::Debug for InMemoryBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBroker")
            .field("scope", &self.scope)
            .field("partition_count", &self.partition_count)
            .finish_non_exhaustive()
    }
}

impl InMemoryBroker {
    /// Creates a broker with `partition_count` partitions per topic. It
    /// keeps no send log.
    #[must_use]
    pub fn new(scope: TransportScope, partition_count: NonZeroU32) -> Self {
        Self::build(scope, partition_count, false)
    }

    /// Creates a broker that also logs every accepted message. The log is
    /// never evicted.
    #[must_use]
    pub fn recording(scope: TransportScope, partition_count: NonZeroU32) -> Self {
        Self::build(scope, partition_count, true)
    }

    /// A recording broker shared between services, with default
    /// partitioning.
    #[must_use]
    pub fn external() -> Self {
        Self::recording(TransportScope::External, DEFAULT_PARTITION_COUNT)
    }

    /// A recording broker private to one service, with default
    /// partitioning.
    #[must_use]
    pub fn internal() -> Self {
        Self::recording(TransportScope::Internal, DEFAULT_PARTITION_COUNT)
    }

    fn build(scope: TransportScope, partition_count: NonZeroU32, record: bool) -> Self {
        info!(
            scope = ?scope,
            partition_count = partition_count.get(),
            send_log = record,
            "In-memory broker initialized"
        );
        Self {
            scope,
            partition_count,
            topics: Mutex::new(HashMap::new()),
            round_robin: AtomicU32::new(0),
            sent: record.then(|| Mutex::new(Vec::new())),
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Whether accepted messages are logged.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.sent.is_some()
    }

    /// Partitions per topic.
    #[must_use]
    pub fn partition_count(&self) -> NonZeroU32 {
        self.partition_count
    }

    /// Every message accepted so far, in acceptance order. Always empty
    /// unless the broker is recording.
    #[must_use]
    pub fn sent(&self) -> Vec<SentRecord> {
        self.sent.as_ref().map_or_else(Vec::new, |log| {
            log.lock().unwrap_or_else(PoisonError::into_inner).clone()
        })
    }

    /// Messages accepted for `topic`, in acceptance order. Always empty
    /// unless the broker is recording.
    #[must_use]
    pub fn sent_to(&self, topic: &str) -> Vec<SentRecord> {
        self.sent.as_ref().map_or_else(Vec::new, |log| {
            log.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .filter(|record| record.message.topic == topic)
                .cloned()
                .collect()
        })
    }

    /// Topics that have been sent to or subscribed to, sorted.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        topics.sort();
        topics
    }

    /// Waits until every accepted message has been delivered to the
    /// subscribers present at delivery time.
    pub async fn drain(&self) {
        loop {
            let idle = self.in_flight.idle.notified();
            if self.in_flight.count.load(Ordering::Acquire) == 0 {
                return;
            }
            idle.await;
        }
    }

    fn choose_partition(&self, partition_key: Option<&str>) -> u32 {
        match partition_key {
            Some(key) => partition_for_key(key, self.partition_count),
            None => self.round_robin.fetch_add(1, Ordering::Relaxed) % self.partition_count.get(),
        }
    }

    fn channels(&self, topic: &str) -> Arc<TopicChannels> {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = topics.get(topic) {
            return Arc::clone(existing);
        }

        let subscribers: Subscribers = Arc::new(RwLock::new(Vec::new()));
        let partitions = (0..self.partition_count.get())
            .map(|partition| {
                let (sender, receiver) = mpsc::channel(PARTITION_QUEUE_CAPACITY);
                tokio::spawn(deliver(
                    topic.to_owned(),
                    partition,
                    receiver,
                    Arc::clone(&subscribers),
                    Arc::clone(&self.in_flight),
                ));
                sender
            })
            .collect();

        let channels = Arc::new(TopicChannels {
            partitions,
            subscribers,
        });
        topics.insert(topic.to_owned(), Arc::clone(&channels));
        debug!(topic = %topic, "Topic created");
        channels
    }
}

async fn deliver(
    topic: String,
    partition: u32,
    mut receiver: mpsc::Receiver<InboundMessage>,
    subscribers: Subscribers,
    in_flight: Arc<InFlight>,
) {
    while let Some(message) = receiver.recv().await {
        let handlers: Vec<Arc<dyn InboundHandler>> = subscribers.read().await.clone();
        for handler in handlers {
            let outcome = handler.on_message(message.clone()).await;
            if !outcome.should_ack() {
                warn!(
                    topic = %topic,
                    partition,
                    outcome = ?outcome,
                    "Message not acknowledged, in-memory broker does not redeliver"
                );
            }
        }
        in_flight.end();
    }
    debug!(topic = %topic, partition, "Partition delivery stopped");
}

#[async_trait]
impl Transport for InMemoryBroker {
    fn scope(&self) -> TransportScope {
        self.scope
    }

    async fn send(&self, message: TransportMessage) -> Result<(), TransportError> {
        let partition = self.choose_partition(message.partition_key.as_deref());
        let channels = self.channels(&message.topic);
        let sender = channels
            .partitions
            .get(partition as usize)
            .cloned()
            .ok_or(TransportError::Closed)?;

        let topic = message.topic.clone();
        let mut inbound = InboundMessage::from(message.clone());
        inbound.metadata.partition = Some(partition);

        // Reserve first: a send dropped while waiting for queue space must
        // not leave the in-flight count raised.
        let permit = sender.reserve().await.map_err(|_| TransportError::Closed)?;
        self.in_flight.begin();
        permit.send(inbound);
        if let Some(log) = &self.sent {
            log.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(SentRecord { message, partition });
        }

        debug!(topic = %topic, partition, "Message accepted");
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn InboundHandler>,
    ) -> Result<(), TransportError> {
        let channels = self.channels(topic);
        channels.subscribers.write().await.push(handler);
        info!(topic = %topic, "Subscriber attached");
        Ok(())
    }
}
