//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresUserBillingRepository` - Billing columns of the host user table

mod user_billing_repository;

pub use user_billing_repository::PostgresUserBillingRepository;
