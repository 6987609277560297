//! Operations host entry point.

use std::error::Error;
use std::sync::Arc;

use operations_service_defaults::config::ServiceConfig;
use operations_service_defaults::host::Host;
use operations_service_defaults::state::AppState;
use operations_service_defaults::{app, telemetry};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    telemetry::init();

    let config = ServiceConfig::from_env()?;
    tracing::info!(service = %config.service_name, "Starting Operations host");

    let addr = config.socket_addr()?;
    let cancel = CancellationToken::new();
    let host = Arc::new(Host::build(config, cancel.clone())?);
    host.start().await?;

    let app = app(AppState::new(Arc::clone(&host)));

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                tracing::warn!("Shutdown signal handler unavailable");
            }
            tracing::info!("Shutting down");
            cancel.cancel();
        })
        .await?;

    host.broker().drain().await;
    Ok(())
}
