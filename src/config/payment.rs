//! Payment configuration

use secrecy::SecretString;
use serde::Deserialize;
use std::fmt;

use super::error::ValidationError;
use crate::domain::billing::{
    PersistenceFailurePolicy, PlanCatalog, StripeWebhookVerifier, DEFAULT_PLAN,
    DEFAULT_TOLERANCE_SECS,
};

/// Payment configuration (Stripe webhooks)
#[derive(Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,

    /// Maximum accepted age of a webhook signature in seconds
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: u64,

    /// Price to plan mapping, `price_a=essential,price_b=pro`
    #[serde(default)]
    pub price_plans: Option<String>,

    /// Plan granted when the price is unknown
    #[serde(default = "default_plan")]
    pub default_plan: String,

    /// Whether storage failures are acknowledged (200) or rejected (500)
    #[serde(default)]
    pub persistence_failure_policy: PersistenceFailurePolicy,
}

impl PaymentConfig {
    /// Build the plan catalog from `price_plans` and `default_plan`
    pub fn plan_catalog(&self) -> Result<PlanCatalog, ValidationError> {
        PlanCatalog::parse(self.price_plans.as_deref().unwrap_or_default(), self.default_plan.trim())
            .map_err(|e| ValidationError::InvalidPricePlans(e.to_string()))
    }

    /// Build the signature verifier for the configured secret
    pub fn webhook_verifier(&self) -> StripeWebhookVerifier {
        StripeWebhookVerifier::new(SecretString::new(self.stripe_webhook_secret.clone()))
            .with_tolerance(self.webhook_tolerance_secs)
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"));
        }
        if !self.stripe_webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if self.webhook_tolerance_secs == 0 || self.webhook_tolerance_secs > 3600 {
            return Err(ValidationError::InvalidWebhookTolerance);
        }
        if self.default_plan.trim().is_empty() {
            return Err(ValidationError::MissingRequired("DEFAULT_PLAN"));
        }
        self.plan_catalog()?;
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_webhook_secret: String::new(),
            webhook_tolerance_secs: default_webhook_tolerance(),
            price_plans: None,
            default_plan: default_plan(),
            persistence_failure_policy: PersistenceFailurePolicy::default(),
        }
    }
}

impl fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("stripe_webhook_secret", &"[REDACTED]")
            .field("webhook_tolerance_secs", &self.webhook_tolerance_secs)
            .field("price_plans", &self.price_plans)
            .field("default_plan", &self.default_plan)
            .field("persistence_failure_policy", &self.persistence_failure_policy)
            .finish()
    }
}

fn default_webhook_tolerance() -> u64 {
    DEFAULT_TOLERANCE_SECS
}

fn default_plan() -> String {
    DEFAULT_PLAN.to_string()
}
