//! In-memory adapters for tests and local development.

mod user_billing_repository;

pub use user_billing_repository::InMemoryUserBillingRepository;
