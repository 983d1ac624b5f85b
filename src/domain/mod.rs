//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `billing` - Stripe webhook events, verification and the user billing record

pub mod billing;
pub mod foundation;
