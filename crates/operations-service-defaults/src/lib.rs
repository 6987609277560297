//! Operations service defaults: the shared host every Operations service
//! runs in.
//!
//! Reads [`config::ServiceConfig`] from the environment, installs the
//! tracing subscriber, wires the services onto one broker
//! ([`host::Host`]) and serves the health and messaging topology routes.

pub mod config;
pub mod error;
pub mod host;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the HTTP application over `state`.
pub fn app(state: AppState) -> Router {
    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/messaging", routes::messaging::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
