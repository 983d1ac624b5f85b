//! In-memory user billing repository.
//!
//! Holds user rows in a map. Useful for testing and local development
//! without PostgreSQL.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{BillingUpdate, UserBillingRecord};
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::ports::{ApplyResult, UserBillingRepository};

/// In-memory storage for user billing records
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserBillingRepository {
    users: Arc<RwLock<HashMap<UserId, UserBillingRecord>>>,
    apply_calls: Arc<AtomicUsize>,
}

impl InMemoryUserBillingRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository seeded with `records`
    pub async fn with_records(records: impl IntoIterator<Item = UserBillingRecord>) -> Self {
        let repo = Self::new();
        for record in records {
            repo.insert(record).await;
        }
        repo
    }

    /// Insert or replace a user row (stands in for account creation)
    pub async fn insert(&self, record: UserBillingRecord) {
        self.users.write().await.insert(record.id.clone(), record);
    }

    /// Number of `apply` calls received, including ones that matched no user
    pub fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }

    /// Get the number of stored users
    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserBillingRepository for InMemoryUserBillingRepository {
    async fn apply(
        &self,
        user_id: &UserId,
        update: &BillingUpdate,
        at: Timestamp,
    ) -> Result<ApplyResult, DomainError> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);

        let mut users = self.users.write().await;
        match users.get_mut(user_id) {
            Some(record) => {
                update.apply_to(record, at);
                Ok(ApplyResult::Updated)
            }
            None => Ok(ApplyResult::UserNotFound),
        }
    }

    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<UserBillingRecord>, DomainError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }
}
