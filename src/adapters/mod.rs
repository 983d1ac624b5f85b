//! Adapters - Implementations of ports for external systems.
//!
//! - `http` - axum routes for inbound webhooks
//! - `postgres` - PostgreSQL-backed repositories
//! - `memory` - In-memory repositories for tests and local development

pub mod http;
pub mod memory;
pub mod postgres;
