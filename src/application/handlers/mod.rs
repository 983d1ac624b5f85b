//! Application handlers.
//!
//! Command handlers that orchestrate domain operations.

pub mod billing;

pub use billing::{HandleWebhookCommand, ReconcileOutcome, WebhookReconciler};
