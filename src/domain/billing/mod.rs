//! Billing module - Stripe webhook authentication, payload normalization and
//! the user billing record the webhooks reconcile.
//!
//! # Module Structure
//!
//! - `stripe_event` - Event envelope as Stripe delivers it
//! - `webhook_verifier` - `Stripe-Signature` verification
//! - `webhook_errors` - Error taxonomy and status mapping
//! - `normalizer` - Provider payload shapes to [`BillingEvent`]
//! - `plan_catalog` - Price id to plan tier
//! - `record` - [`UserBillingRecord`] and [`BillingUpdate`]

mod normalizer;
mod plan_catalog;
mod record;
mod stripe_event;
mod webhook_errors;
mod webhook_verifier;

pub use normalizer::{normalize, BillingEvent, InvoicePaid, SubscriptionDeleted};
pub use plan_catalog::{PlanCatalog, DEFAULT_PLAN};
pub use record::{BillingUpdate, UserBillingRecord};
pub use stripe_event::{StripeEvent, StripeEventData, StripeEventType};
pub use webhook_errors::{ErrorCategory, PersistenceFailurePolicy, WebhookError};
pub use webhook_verifier::{
    sign_payload, SignatureHeader, StripeWebhookVerifier, DEFAULT_TOLERANCE_SECS,
};
