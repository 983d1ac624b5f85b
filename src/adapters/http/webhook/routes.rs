//! Axum router configuration for the Stripe webhook endpoint.

use axum::{routing::post, Router};

use super::handlers::{handle_stripe_webhook, WebhookAppState};

/// Create the Stripe webhook router.
///
/// No user authentication; deliveries are verified via signature.
///
/// # Routes
/// - `POST /webhook` - Handle Stripe webhooks
pub fn webhook_routes() -> Router<WebhookAppState> {
    Router::new().route("/webhook", post(handle_stripe_webhook))
}

/// Webhook routes mounted under `/api/stripe`.
pub fn webhook_router() -> Router<WebhookAppState> {
    Router::new().nest("/api/stripe", webhook_routes())
}
