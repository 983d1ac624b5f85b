//! Billing command handlers.

mod reconcile_webhook;

pub use reconcile_webhook::{HandleWebhookCommand, ReconcileOutcome, WebhookReconciler};
