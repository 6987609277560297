//! Shared test helpers for host integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use operations_service_defaults::app;
use operations_service_defaults::config::ServiceConfig;
use operations_service_defaults::host::Host;
use operations_service_defaults::state::AppState;

/// Configuration built from `vars` only; the process environment is ignored.
pub fn config(vars: &[(&str, &str)]) -> ServiceConfig {
    ServiceConfig::from_lookup(|name| {
        vars.iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| (*value).to_string())
    })
    .unwrap()
}

/// A started host with default configuration.
pub async fn start_host(vars: &[(&str, &str)]) -> Arc<Host> {
    let host = Arc::new(Host::build(config(vars), CancellationToken::new()).unwrap());
    host.start().await.unwrap();
    host
}

/// The full router over a started host. Uses the same route structure as
/// `main.rs`.
pub async fn build_test_app() -> Router {
    app(AppState::new(start_host(&[]).await))
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
