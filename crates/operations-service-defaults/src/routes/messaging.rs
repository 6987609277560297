//! Messaging topology endpoints: what each service publishes and consumes.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};
use operations_messaging::{EventDescriptor, MessageClass};
use serde::Serialize;

use crate::error::ApiError;
use crate::host::ServiceInfo;
use crate::state::AppState;

/// One registered event type.
#[derive(Debug, Serialize)]
pub struct EventTopicResponse {
    /// Wire type name.
    pub event_type: &'static str,
    /// Destination topic.
    pub topic: String,
    /// Integration or non-integration message.
    pub class: MessageClass,
    /// Whether the event stays on the service's internal bus.
    pub internal: bool,
    /// Partition-key fields in resolution order.
    pub partition_key_fields: Vec<&'static str>,
}

impl From<&EventDescriptor> for EventTopicResponse {
    fn from(descriptor: &EventDescriptor) -> Self {
        Self {
            event_type: descriptor.event_type(),
            topic: descriptor.topic().to_owned(),
            class: descriptor.class(),
            internal: descriptor.is_internal(),
            partition_key_fields: descriptor
                .partition_key_fields()
                .iter()
                .map(|field| field.name())
                .collect(),
        }
    }
}

/// Topology of one service.
#[derive(Debug, Serialize)]
pub struct ServiceTopicsResponse {
    /// Domain name of the service.
    pub service: &'static str,
    /// Envelope `source` of its integration events.
    pub source: String,
    /// Every event type its registry describes, sorted by wire type.
    pub events: Vec<EventTopicResponse>,
    /// Topics it consumes.
    pub subscriptions: Vec<String>,
}

impl From<ServiceInfo> for ServiceTopicsResponse {
    fn from(info: ServiceInfo) -> Self {
        Self {
            service: info.name,
            events: info
                .registry
                .descriptors()
                .iter()
                .map(|descriptor| EventTopicResponse::from(descriptor.as_ref()))
                .collect(),
            source: info.source,
            subscriptions: info.subscriptions,
        }
    }
}

/// GET /topics
async fn list_topics(State(state): State<AppState>) -> Json<Vec<ServiceTopicsResponse>> {
    Json(
        state
            .host
            .services()
            .into_iter()
            .map(ServiceTopicsResponse::from)
            .collect(),
    )
}

/// GET /topics/{service}
async fn service_topics(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Result<Json<ServiceTopicsResponse>, ApiError> {
    state
        .host
        .services()
        .into_iter()
        .find(|info| info.name == service)
        .map(|info| Json(ServiceTopicsResponse::from(info)))
        .ok_or(ApiError::UnknownService(service))
}

/// Returns the messaging topology router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/topics", get(list_topics))
        .route("/topics/{service}", get(service_topics))
}
