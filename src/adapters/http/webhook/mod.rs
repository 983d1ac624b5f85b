//! HTTP adapter for the Stripe webhook endpoint.
//!
//! - `POST /api/stripe/webhook` - Reconcile a Stripe billing event

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::WebhookAck;
pub use handlers::{handle_stripe_webhook, WebhookApiError, WebhookAppState, STRIPE_SIGNATURE_HEADER};
pub use routes::{webhook_router, webhook_routes};
