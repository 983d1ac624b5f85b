//! PostgreSQL implementation of UserBillingRepository.
//!
//! Writes the billing columns of the host application's user table. The
//! table is expected to have a text `id` primary key and the columns
//! `stripe_customer_id`, `stripe_subscription_id`, `plan` (nullable text) and
//! `updated_at` (timestamptz).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::{BillingUpdate, UserBillingRecord};
use crate::domain::foundation::{DomainError, ErrorCode, TableName, Timestamp, UserId};
use crate::ports::{ApplyResult, UserBillingRepository};

/// PostgreSQL implementation of the UserBillingRepository port.
pub struct PostgresUserBillingRepository {
    pool: PgPool,
    update_sql: String,
    select_sql: String,
}

impl PostgresUserBillingRepository {
    /// Creates a repository writing to the default `users` table.
    pub fn new(pool: PgPool) -> Self {
        Self::with_table(pool, &TableName::default())
    }

    /// Creates a repository writing to `table`.
    pub fn with_table(pool: PgPool, table: &TableName) -> Self {
        let quoted = table.quoted();
        Self {
            pool,
            update_sql: update_statement(&quoted),
            select_sql: select_statement(&quoted),
        }
    }
}

/// Database row representation of a user's billing columns.
#[derive(Debug, sqlx::FromRow)]
struct UserBillingRow {
    id: String,
    stripe_customer_id: Option<String>,
    stripe_subscription_id: Option<String>,
    plan: Option<String>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserBillingRow> for UserBillingRecord {
    type Error = DomainError;

    fn try_from(row: UserBillingRow) -> Result<Self, Self::Error> {
        Ok(UserBillingRecord {
            id: UserId::new(row.id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user id: {}", e))
            })?,
            stripe_customer_id: row.stripe_customer_id,
            stripe_subscription_id: row.stripe_subscription_id,
            plan: row.plan,
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn update_statement(table: &str) -> String {
    format!(
        r#"
        UPDATE {} SET
            stripe_customer_id = $2,
            stripe_subscription_id = $3,
            plan = $4,
            updated_at = $5
        WHERE id = $1
        "#,
        table
    )
}

fn select_statement(table: &str) -> String {
    format!(
        r#"
        SELECT id, stripe_customer_id, stripe_subscription_id, plan, updated_at
        FROM {}
        WHERE id = $1
        "#,
        table
    )
}

#[async_trait]
impl UserBillingRepository for PostgresUserBillingRepository {
    async fn apply(
        &self,
        user_id: &UserId,
        update: &BillingUpdate,
        at: Timestamp,
    ) -> Result<ApplyResult, DomainError> {
        let (customer_id, subscription_id, plan) = update.columns();

        let result = sqlx::query(&self.update_sql)
            .bind(user_id.as_str())
            .bind(customer_id)
            .bind(subscription_id)
            .bind(plan)
            .bind(at.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::database(format!("Failed to update user billing: {}", e))
                    .with_detail("user_id", user_id.as_str())
            })?;

        if result.rows_affected() == 0 {
            return Ok(ApplyResult::UserNotFound);
        }

        Ok(ApplyResult::Updated)
    }

    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<UserBillingRecord>, DomainError> {
        let row: Option<UserBillingRow> = sqlx::query_as(&self.select_sql)
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to find user: {}", e)))?;

        row.map(UserBillingRecord::try_from).transpose()
    }
}
