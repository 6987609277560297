mod common;

use std::sync::Arc;
use std::time::Duration;

use common::integration_events::OrderCompleted;
use common::{OrderTotalsRecalculated, TENANT, dispatcher, order_completed, tenant};
use operations_messaging::{
    CloudEventEnvelope, DispatchOutcome, ENVELOPE_CONTENT_TYPE, InMemoryBroker, MessagingError,
    Transport, TransportError,
};
use operations_test_support::{FailingTransport, RecordingHandler, RecordingTransport};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_published_event_round_trips_to_subscriber() {
    // Arrange
    let broker = Arc::new(InMemoryBroker::external());
    let producer = dispatcher(Arc::clone(&broker) as Arc<dyn Transport>, "urn:operations:billing");
    let consumer = dispatcher(Arc::clone(&broker) as Arc<dyn Transport>, "urn:operations:accounting");
    let handler = RecordingHandler::<OrderCompleted>::new();
    consumer.on::<OrderCompleted, _>(handler.clone()).unwrap();
    let cancel = CancellationToken::new();
    consumer.subscribe(&cancel).await.unwrap();
    let event = order_completed(tenant(), 1);

    // Act
    producer.publish(&event, &cancel).await.unwrap();

    // Assert
    assert!(handler.wait_for(1, WAIT).await);
    assert_eq!(handler.received(), vec![event]);
}

#[tokio::test]
async fn test_order_completed_routes_by_tenant_to_entity_topic() {
    // Arrange
    let broker = Arc::new(InMemoryBroker::external());
    let producer = dispatcher(Arc::clone(&broker) as Arc<dyn Transport>, "urn:operations:billing");

    // Act
    let receipt = producer
        .publish(&order_completed(tenant(), 1), &CancellationToken::new())
        .await
        .unwrap();

    // Assert
    assert_eq!(receipt.topic, "billing.order");
    assert_eq!(receipt.partition_key.unwrap().as_str(), TENANT);
    let sent = broker.sent_to("billing.order");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message.partition_key.as_deref(), Some(TENANT));
    assert_eq!(sent[0].message.content_type, ENVELOPE_CONTENT_TYPE);
    let envelope = CloudEventEnvelope::from_slice(&sent[0].message.payload).unwrap();
    assert_eq!(envelope.event_type, "OrderCompleted");
    assert_eq!(envelope.source, "urn:operations:billing");
    assert_eq!(envelope.id, "00000000-0000-0000-0000-000000000001");
}

#[tokio::test]
async fn test_same_tenant_events_arrive_in_publish_order() {
    let broker = Arc::new(InMemoryBroker::external());
    let producer = dispatcher(Arc::clone(&broker) as Arc<dyn Transport>, "urn:operations:billing");
    let consumer = dispatcher(Arc::clone(&broker) as Arc<dyn Transport>, "urn:operations:accounting");
    let handler = RecordingHandler::<OrderCompleted>::new();
    consumer.on::<OrderCompleted, _>(handler.clone()).unwrap();
    let cancel = CancellationToken::new();
    consumer.subscribe(&cancel).await.unwrap();
    let other_tenant = Uuid::parse_str("22222222-2222-2222-2222-222222222222").unwrap();

    for sequence in 0..20 {
        producer
            .publish(&order_completed(tenant(), sequence), &cancel)
            .await
            .unwrap();
        producer
            .publish(&order_completed(other_tenant, sequence), &cancel)
            .await
            .unwrap();
    }
    broker.drain().await;

    let received = handler.received();
    assert_eq!(received.len(), 40);
    for tenant_id in [tenant(), other_tenant] {
        let sequences: Vec<u32> = received
            .iter()
            .filter(|e| e.tenant_id == tenant_id)
            .map(|e| e.sequence)
            .collect();
        assert_eq!(sequences, (0..20).collect::<Vec<u32>>());
    }
}

#[tokio::test]
async fn test_internal_event_is_refused_by_shared_broker() {
    let broker = Arc::new(InMemoryBroker::external());
    let producer = dispatcher(Arc::clone(&broker) as Arc<dyn Transport>, "urn:operations:billing");
    let event = OrderTotalsRecalculated {
        order_id: Uuid::new_v4(),
        total_cents: 4_200,
    };

    let err = producer
        .publish(&event, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MessagingError::InternalEventOnExternalTransport { ref event_type, .. }
            if event_type == "OrderTotalsRecalculated"
    ));
    assert!(broker.sent().is_empty());
}

#[tokio::test]
async fn test_internal_event_is_delivered_raw_on_internal_bus() {
    let bus = Arc::new(InMemoryBroker::internal());
    let service = dispatcher(Arc::clone(&bus) as Arc<dyn Transport>, "urn:operations:billing");
    let handler = RecordingHandler::<OrderTotalsRecalculated>::new();
    service.on::<OrderTotalsRecalculated, _>(handler.clone()).unwrap();
    let cancel = CancellationToken::new();
    service.subscribe(&cancel).await.unwrap();
    let event = OrderTotalsRecalculated {
        order_id: Uuid::new_v4(),
        total_cents: 4_200,
    };

    let receipt = service.publish(&event, &cancel).await.unwrap();

    assert!(receipt.envelope_id.is_none());
    assert!(receipt.partition_key.is_none());
    assert!(handler.wait_for(1, WAIT).await);
    assert_eq!(handler.received(), vec![event]);
}

#[tokio::test]
async fn test_transport_error_reaches_caller_unchanged() {
    let producer = dispatcher(Arc::new(FailingTransport), "urn:operations:billing");

    let err = producer
        .publish(&order_completed(tenant(), 1), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        MessagingError::Transport(TransportError::SendFailed { topic, cause }) => {
            assert_eq!(topic, "billing.order");
            assert_eq!(cause, FailingTransport::CAUSE);
        }
        other => panic!("expected SendFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unregistered_and_poison_messages_are_acked_and_skipped() {
    // Arrange
    let transport = Arc::new(RecordingTransport::external());
    let service = dispatcher(Arc::clone(&transport) as Arc<dyn Transport>, "urn:operations:billing");
    let handler = RecordingHandler::<OrderCompleted>::new();
    service.on::<OrderCompleted, _>(handler.clone()).unwrap();
    service.subscribe(&CancellationToken::new()).await.unwrap();
    service
        .publish(&order_completed(tenant(), 1), &CancellationToken::new())
        .await
        .unwrap();
    transport
        .send(operations_messaging::TransportMessage {
            topic: "billing.order".to_owned(),
            partition_key: None,
            payload: b"{not json".to_vec(),
            content_type: ENVELOPE_CONTENT_TYPE.to_owned(),
            event_type: "OrderCompleted".to_owned(),
        })
        .await
        .unwrap();
    transport
        .send(operations_messaging::TransportMessage {
            topic: "billing.order".to_owned(),
            partition_key: None,
            payload: b"{}".to_vec(),
            content_type: "application/json".to_owned(),
            event_type: "OrderArchived".to_owned(),
        })
        .await
        .unwrap();

    // Act
    let outcomes = transport.deliver_sent().await;

    // Assert
    assert_eq!(
        outcomes,
        vec![
            DispatchOutcome::Handled,
            DispatchOutcome::Poison,
            DispatchOutcome::Unhandled
        ]
    );
    assert!(outcomes.iter().all(DispatchOutcome::should_ack));
    assert_eq!(handler.received().len(), 1);
    assert_eq!(transport.subscribed_topics(), vec!["billing.order"]);
}
