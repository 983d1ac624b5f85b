//! Billing Reconciler - Stripe webhook receiver
//!
//! Authenticates Stripe billing webhooks and reconciles `invoice.paid` and
//! `customer.subscription.deleted` events onto the billing columns of an
//! existing user record.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
