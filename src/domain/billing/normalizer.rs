//! Normalizes Stripe event payloads into provider-neutral billing events.
//!
//! Every assumption about where Stripe puts an identifier lives in this file.
//! Stripe has moved these fields between API versions (for example
//! `invoice.subscription` became `invoice.parent.subscription_details.subscription`),
//! so each identifier is looked up through an ordered list of candidate
//! locations and the first non-empty hit wins.

use serde_json::Value;

use super::stripe_event::{StripeEvent, StripeEventType};

/// Provider-neutral view of an event the reconciler can act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    InvoicePaid(InvoicePaid),
    SubscriptionDeleted(SubscriptionDeleted),
    /// Any event type the reconciler does not handle.
    Other { event_type: String },
}

/// Identifiers extracted from an `invoice.paid` event.
///
/// Every field is optional; deciding what is required is the reconciler's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoicePaid {
    pub invoice_id: Option<String>,
    pub user_id: Option<String>,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub price_id: Option<String>,
}

/// Identifiers extracted from a `customer.subscription.deleted` event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionDeleted {
    pub subscription_id: Option<String>,
    pub customer_id: Option<String>,
    pub user_id: Option<String>,
}

impl BillingEvent {
    /// Stripe event type string this event came from.
    pub fn event_type(&self) -> &str {
        match self {
            BillingEvent::InvoicePaid(_) => StripeEventType::InvoicePaid.as_str(),
            BillingEvent::SubscriptionDeleted(_) => {
                StripeEventType::CustomerSubscriptionDeleted.as_str()
            }
            BillingEvent::Other { event_type } => event_type.as_str(),
        }
    }
}

/// Maps a Stripe event to a [`BillingEvent`].
pub fn normalize(event: &StripeEvent) -> BillingEvent {
    let object = &event.data.object;
    match event.parsed_type() {
        StripeEventType::InvoicePaid => BillingEvent::InvoicePaid(normalize_invoice(object)),
        StripeEventType::CustomerSubscriptionDeleted => {
            BillingEvent::SubscriptionDeleted(normalize_subscription(object))
        }
        StripeEventType::Unknown => BillingEvent::Other {
            event_type: event.event_type.clone(),
        },
    }
}

fn normalize_invoice(invoice: &Value) -> InvoicePaid {
    let line = at(invoice, &["lines", "data"]).and_then(|data| data.get(0));

    let subscription_id = first_of([
        line.and_then(|l| id_at(l, &["parent", "subscription_item_details", "subscription"])),
        line.and_then(|l| id_at(l, &["parent", "subscription_details", "subscription"])),
        line.and_then(|l| id_at(l, &["subscription"])),
        id_at(invoice, &["parent", "subscription_details", "subscription"]),
        id_at(invoice, &["subscription"]),
    ]);

    let user_id = first_of([
        line.and_then(|l| user_id_in(l, &["parent", "subscription_details", "metadata"])),
        line.and_then(|l| user_id_in(l, &["metadata"])),
        user_id_in(invoice, &["parent", "subscription_details", "metadata"]),
        user_id_in(invoice, &["subscription_details", "metadata"]),
        user_id_in(invoice, &["metadata"]),
    ]);

    let price_id = line.and_then(|l| {
        first_of([
            str_at(l, &["pricing", "price_details", "price"]),
            id_at(l, &["price"]),
            id_at(l, &["plan"]),
        ])
    });

    InvoicePaid {
        invoice_id: str_at(invoice, &["id"]),
        user_id,
        customer_id: id_at(invoice, &["customer"]),
        subscription_id,
        price_id,
    }
}

fn normalize_subscription(subscription: &Value) -> SubscriptionDeleted {
    SubscriptionDeleted {
        subscription_id: str_at(subscription, &["id"]),
        customer_id: id_at(subscription, &["customer"]),
        user_id: user_id_in(subscription, &["metadata"]),
    }
}

/// Walks `path` through nested objects.
fn at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

/// Non-empty string at `path`.
fn str_at(value: &Value, path: &[&str]) -> Option<String> {
    at(value, path).and_then(non_empty)
}

/// Identifier at `path`, given either as a string or as an expanded object.
fn id_at(value: &Value, path: &[&str]) -> Option<String> {
    match at(value, path)? {
        Value::Object(expanded) => expanded.get("id").and_then(non_empty),
        other => non_empty(other),
    }
}

/// Reads `userId` (or `user_id`) from the metadata object at `path`.
fn user_id_in(value: &Value, path: &[&str]) -> Option<String> {
    let metadata = at(value, path)?;
    first_of([
        metadata.get("userId").and_then(non_empty),
        metadata.get("user_id").and_then(non_empty),
    ])
}

/// String value unless it is blank. Non-blank values are returned untouched.
fn non_empty(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn first_of<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates.into_iter().flatten().next()
}
