//! User billing record and the writes the reconciler may apply to it.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

/// Billing columns of a user row owned by the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBillingRecord {
    pub id: UserId,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub plan: Option<String>,
    pub updated_at: Timestamp,
}

impl UserBillingRecord {
    /// A user that has never subscribed.
    pub fn new(id: UserId, created_at: Timestamp) -> Self {
        Self {
            id,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            plan: None,
            updated_at: created_at,
        }
    }
}

/// The closed set of writes against a [`UserBillingRecord`].
///
/// Both variants overwrite all three billing fields, so applying the same
/// update twice leaves the record as applying it once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingUpdate {
    /// Attach a paid subscription.
    Attach {
        customer_id: String,
        subscription_id: String,
        plan: String,
    },
    /// Reset billing fields to null.
    Clear,
}

impl BillingUpdate {
    /// Applies the update in place and stamps `updated_at`.
    pub fn apply_to(&self, record: &mut UserBillingRecord, at: Timestamp) {
        match self {
            BillingUpdate::Attach {
                customer_id,
                subscription_id,
                plan,
            } => {
                record.stripe_customer_id = Some(customer_id.clone());
                record.stripe_subscription_id = Some(subscription_id.clone());
                record.plan = Some(plan.clone());
            }
            BillingUpdate::Clear => {
                record.stripe_customer_id = None;
                record.stripe_subscription_id = None;
                record.plan = None;
            }
        }
        record.updated_at = at;
    }

    /// Column values in `(customer, subscription, plan)` order.
    pub fn columns(&self) -> (Option<&str>, Option<&str>, Option<&str>) {
        match self {
            BillingUpdate::Attach {
                customer_id,
                subscription_id,
                plan,
            } => (
                Some(customer_id.as_str()),
                Some(subscription_id.as_str()),
                Some(plan.as_str()),
            ),
            BillingUpdate::Clear => (None, None, None),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BillingUpdate::Attach { .. } => "attach",
            BillingUpdate::Clear => "clear",
        }
    }
}
