//! HTTP adapters - axum routers for the service.
//!
//! - `webhook` - Stripe webhook endpoint
//! - `health` - Liveness probe

pub mod health;
pub mod webhook;

use std::future::Future;
use std::io;
use std::time::Duration;

use axum::Router;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub use health::health_routes;
pub use webhook::{webhook_router, WebhookAppState};

/// Builds the complete application router with tracing and request timeouts.
pub fn app_router(state: WebhookAppState, request_timeout: Duration) -> Router {
    Router::new()
        .merge(webhook_router())
        .merge(health_routes())
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

/// Resolves on Ctrl+C, for `axum::serve(..).with_graceful_shutdown`.
pub async fn shutdown_signal() {
    wait_for_signal(tokio::signal::ctrl_c()).await
}

/// Never resolves when the listener could not be installed, so the server keeps running.
async fn wait_for_signal(signal: impl Future<Output = io::Result<()>>) {
    match signal.await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await
        }
    }
}
