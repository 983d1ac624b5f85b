//! User billing repository port.
//!
//! Defines the contract for writing the billing columns of existing user rows.
//! The host application owns the user table; implementations never insert or
//! delete rows.
//!
//! # Example
//!
//! ```ignore
//! async fn attach(
//!     repo: &dyn UserBillingRepository,
//!     user_id: &UserId,
//! ) -> Result<(), DomainError> {
//!     let update = BillingUpdate::Attach {
//!         customer_id: "cus_1".into(),
//!         subscription_id: "sub_1".into(),
//!         plan: "essential".into(),
//!     };
//!     match repo.apply(user_id, &update, Timestamp::now()).await? {
//!         ApplyResult::Updated => Ok(()),
//!         ApplyResult::UserNotFound => Err(DomainError::new(ErrorCode::UserNotFound, "no such user")),
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::domain::billing::{BillingUpdate, UserBillingRecord};
use crate::domain::foundation::{DomainError, Timestamp, UserId};

/// Outcome of a billing write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    /// Exactly one row was written.
    Updated,
    /// No row has the given id; nothing was written.
    UserNotFound,
}

/// Repository port for the billing columns of a user record.
///
/// Implementations must write all billing fields and `updated_at` in a single
/// atomic operation so a record is never observed half-updated.
#[async_trait]
pub trait UserBillingRepository: Send + Sync {
    /// Apply `update` to the user with `user_id`, stamping `updated_at = at`.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn apply(
        &self,
        user_id: &UserId,
        update: &BillingUpdate,
        at: Timestamp,
    ) -> Result<ApplyResult, DomainError>;

    /// Find the billing record of a user.
    ///
    /// Returns `None` if the user does not exist.
    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<UserBillingRecord>, DomainError>;
}
