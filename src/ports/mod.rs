//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `UserBillingRepository` - Writes billing columns of existing users

mod user_billing_repository;

pub use user_billing_repository::{ApplyResult, UserBillingRepository};
