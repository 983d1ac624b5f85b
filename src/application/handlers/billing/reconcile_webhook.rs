//! WebhookReconciler - Command handler mapping Stripe billing webhooks onto
//! user billing records.
//!
//! Every invocation authenticates, parses, normalizes and then issues at most
//! one repository write. Writes are full overwrites, so Stripe redelivering an
//! event leaves the same end state.

use std::sync::Arc;

use crate::domain::billing::{
    normalize, BillingEvent, BillingUpdate, ErrorCategory, InvoicePaid, PersistenceFailurePolicy,
    PlanCatalog, StripeEvent, StripeWebhookVerifier, SubscriptionDeleted, WebhookError,
};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{ApplyResult, UserBillingRepository};

/// Command to reconcile one webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// Stripe-Signature header value, if present.
    pub signature: Option<String>,
}

/// Result of webhook processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Invoice paid, subscription attached to the user.
    SubscriptionAttached {
        user_id: UserId,
        customer_id: String,
        subscription_id: String,
        plan: String,
    },
    /// Subscription deleted, billing fields cleared.
    SubscriptionCleared { user_id: UserId },
    /// Event acknowledged without a write.
    Skipped(WebhookError),
    /// Event type the reconciler does not handle.
    Ignored { event_type: String },
}

/// Handler for Stripe billing webhooks.
///
/// Built once at startup; holds no per-request state.
pub struct WebhookReconciler {
    verifier: Arc<StripeWebhookVerifier>,
    repository: Arc<dyn UserBillingRepository>,
    plans: PlanCatalog,
    policy: PersistenceFailurePolicy,
}

impl WebhookReconciler {
    pub fn new(
        verifier: Arc<StripeWebhookVerifier>,
        repository: Arc<dyn UserBillingRepository>,
        plans: PlanCatalog,
    ) -> Self {
        Self {
            verifier,
            repository,
            plans,
            policy: PersistenceFailurePolicy::default(),
        }
    }

    /// Sets how storage failures are reported back to Stripe.
    pub fn with_policy(mut self, policy: PersistenceFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> PersistenceFailurePolicy {
        self.policy
    }

    pub async fn handle(&self, cmd: HandleWebhookCommand) -> Result<ReconcileOutcome, WebhookError> {
        // 1. Authenticate
        let signature = cmd.signature.as_deref().ok_or_else(|| {
            tracing::warn!("Webhook rejected: missing Stripe-Signature header");
            WebhookError::MissingSignature
        })?;

        // 2. Parse, only once the signature holds
        let event = self
            .verifier
            .verify_and_parse(&cmd.payload, signature)
            .map_err(|e| {
                match e.category() {
                    ErrorCategory::MalformedPayload => {
                        tracing::warn!(error = %e, "Webhook rejected: payload is not a Stripe event")
                    }
                    _ => tracing::warn!(error = %e, "Webhook rejected: signature verification failed"),
                }
                e
            })?;

        // 3. Normalize and dispatch
        let billing_event = normalize(&event);
        tracing::debug!(
            event_id = %event.id,
            event_type = billing_event.event_type(),
            livemode = event.livemode,
            "Dispatching webhook event"
        );
        match billing_event {
            BillingEvent::InvoicePaid(invoice) => self.reconcile_invoice_paid(&event, invoice).await,
            BillingEvent::SubscriptionDeleted(deleted) => {
                self.reconcile_subscription_deleted(&event, deleted).await
            }
            BillingEvent::Other { event_type } => {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event_type,
                    "Ignoring unhandled webhook event type"
                );
                Ok(ReconcileOutcome::Ignored { event_type })
            }
        }
    }

    async fn reconcile_invoice_paid(
        &self,
        event: &StripeEvent,
        invoice: InvoicePaid,
    ) -> Result<ReconcileOutcome, WebhookError> {
        tracing::info!(
            event_id = %event.id,
            invoice_id = ?invoice.invoice_id,
            user_id = ?invoice.user_id,
            customer_id = ?invoice.customer_id,
            subscription_id = ?invoice.subscription_id,
            price_id = ?invoice.price_id,
            "Received invoice.paid"
        );

        let (user_id, customer_id, subscription_id) =
            match (invoice.user_id, invoice.customer_id, invoice.subscription_id) {
                (Some(user_id), Some(customer_id), Some(subscription_id)) => {
                    (user_id, customer_id, subscription_id)
                }
                (user_id, customer_id, subscription_id) => {
                    let missing = [
                        ("user_id", user_id.is_none()),
                        ("customer_id", customer_id.is_none()),
                        ("subscription_id", subscription_id.is_none()),
                    ]
                    .into_iter()
                    .filter_map(|(name, absent)| absent.then_some(name))
                    .collect();
                    return Ok(self.skip_incomplete(event, missing));
                }
            };

        let user_id = match UserId::new(user_id) {
            Ok(user_id) => user_id,
            Err(_) => return Ok(self.skip_incomplete(event, vec!["user_id"])),
        };
        let plan = self.plans.resolve(invoice.price_id.as_deref()).to_string();

        let update = BillingUpdate::Attach {
            customer_id: customer_id.clone(),
            subscription_id: subscription_id.clone(),
            plan: plan.clone(),
        };
        if let Some(skipped) = self.write(event, &user_id, &update).await? {
            return Ok(ReconcileOutcome::Skipped(skipped));
        }

        tracing::info!(
            event_id = %event.id,
            user_id = %user_id,
            customer_id = %customer_id,
            subscription_id = %subscription_id,
            plan = %plan,
            "Subscription attached to user"
        );

        Ok(ReconcileOutcome::SubscriptionAttached {
            user_id,
            customer_id,
            subscription_id,
            plan,
        })
    }

    async fn reconcile_subscription_deleted(
        &self,
        event: &StripeEvent,
        deleted: SubscriptionDeleted,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let user_id = match deleted.user_id.map(UserId::new) {
            Some(Ok(user_id)) => user_id,
            _ => {
                tracing::warn!(
                    event_id = %event.id,
                    subscription_id = ?deleted.subscription_id,
                    customer_id = ?deleted.customer_id,
                    "Subscription deleted without userId metadata"
                );
                return Ok(self.skip_incomplete(event, vec!["user_id"]));
            }
        };

        if let Some(skipped) = self.write(event, &user_id, &BillingUpdate::Clear).await? {
            return Ok(ReconcileOutcome::Skipped(skipped));
        }

        tracing::info!(
            event_id = %event.id,
            user_id = %user_id,
            subscription_id = ?deleted.subscription_id,
            "Subscription cleared from user"
        );

        Ok(ReconcileOutcome::SubscriptionCleared { user_id })
    }

    fn skip_incomplete(&self, event: &StripeEvent, missing: Vec<&'static str>) -> ReconcileOutcome {
        let err = WebhookError::incomplete(event.event_type.clone(), missing);
        tracing::warn!(
            event_id = %event.id,
            event_type = %event.event_type,
            error = %err,
            "Skipping incomplete webhook event"
        );
        ReconcileOutcome::Skipped(err)
    }

    /// Issues the single write for this event.
    ///
    /// `Ok(Some(_))` means the event is acknowledged without a change.
    async fn write(
        &self,
        event: &StripeEvent,
        user_id: &UserId,
        update: &BillingUpdate,
    ) -> Result<Option<WebhookError>, WebhookError> {
        match self.repository.apply(user_id, update, Timestamp::now()).await {
            Ok(ApplyResult::Updated) => Ok(None),
            Ok(ApplyResult::UserNotFound) => {
                tracing::warn!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    user_id = %user_id,
                    "Webhook names a user that does not exist"
                );
                Ok(Some(WebhookError::UnknownUser(user_id.to_string())))
            }
            Err(e) => {
                let err = WebhookError::Persistence(e.to_string());
                tracing::error!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    user_id = %user_id,
                    update = update.kind(),
                    error = %e,
                    policy = ?self.policy,
                    "Failed to persist billing update"
                );
                if err.is_acknowledged(self.policy) {
                    Ok(Some(err))
                } else {
                    Err(err)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryUserBillingRepository;
    use crate::domain::billing::{sign_payload, UserBillingRecord};
    use crate::domain::foundation::DomainError;
    use async_trait::async_trait;
    use secrecy::SecretString;
    use serde_json::{json, Value};

    const SECRET: &str = "whsec_reconciler_test";

    // ════════════════════════════════════════════════════════════════════════════
    // Test Fixtures
    // ════════════════════════════════════════════════════════════════════════════

    struct FailingRepository;

    #[async_trait]
    impl UserBillingRepository for FailingRepository {
        async fn apply(
            &self,
            _user_id: &UserId,
            _update: &BillingUpdate,
            _at: Timestamp,
        ) -> Result<ApplyResult, DomainError> {
            Err(DomainError::database("connection reset"))
        }

        async fn find_by_id(&self, _user_id: &UserId) -> Result<Option<UserBillingRecord>, DomainError> {
            Err(DomainError::database("connection reset"))
        }
    }

    fn user(id: &str) -> UserBillingRecord {
        UserBillingRecord::new(UserId::new(id).unwrap(), Timestamp::from_unix_secs(0).unwrap())
    }

    fn verifier() -> Arc<StripeWebhookVerifier> {
        Arc::new(StripeWebhookVerifier::new(SecretString::new(SECRET.to_string())))
    }

    fn plans() -> PlanCatalog {
        PlanCatalog::default().with_price("price_pro", "pro")
    }

    async fn setup() -> (WebhookReconciler, InMemoryUserBillingRepository) {
        let repo = InMemoryUserBillingRepository::with_records([user("u1"), user("u2")]).await;
        let reconciler = WebhookReconciler::new(verifier(), Arc::new(repo.clone()), plans());
        (reconciler, repo)
    }

    fn event(event_type: &str, object: Value) -> Vec<u8> {
        json!({
            "id": "evt_test",
            "type": event_type,
            "created": 1_704_067_200,
            "data": { "object": object },
            "livemode": false
        })
        .to_string()
        .into_bytes()
    }

    fn invoice_paid(user_id: Option<&str>, price: &str) -> Vec<u8> {
        let metadata = match user_id {
            Some(id) => json!({ "userId": id }),
            None => json!({}),
        };
        event(
            "invoice.paid",
            json!({
                "id": "in_1",
                "customer": "cus_1",
                "lines": { "data": [{
                    "parent": { "subscription_item_details": { "subscription": "sub_1" } },
                    "metadata": metadata,
                    "pricing": { "price_details": { "price": price } }
                }]}
            }),
        )
    }

    fn subscription_deleted(user_id: Option<&str>) -> Vec<u8> {
        let mut object = json!({ "id": "sub_1", "customer": "cus_1", "metadata": {} });
        if let Some(id) = user_id {
            object["metadata"]["userId"] = json!(id);
        }
        event("customer.subscription.deleted", object)
    }

    fn signed(payload: Vec<u8>) -> HandleWebhookCommand {
        let signature = sign_payload(SECRET, chrono::Utc::now().timestamp(), &payload).unwrap();
        HandleWebhookCommand {
            payload,
            signature: Some(signature),
        }
    }

    async fn stored(repo: &InMemoryUserBillingRepository, id: &str) -> UserBillingRecord {
        repo.find_by_id(&UserId::new(id).unwrap()).await.unwrap().unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Authentication
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn missing_signature_is_rejected_without_writes() {
        let (reconciler, repo) = setup().await;

        let result = reconciler
            .handle(HandleWebhookCommand {
                payload: invoice_paid(Some("u1"), "price_pro"),
                signature: None,
            })
            .await;

        assert_eq!(result, Err(WebhookError::MissingSignature));
        assert_eq!(repo.apply_calls(), 0);
    }

    #[tokio::test]
    async fn invalid_signature_is_rejected_without_writes() {
        let (reconciler, repo) = setup().await;
        let payload = invoice_paid(Some("u1"), "price_pro");
        let signature = sign_payload("whsec_someone_else", chrono::Utc::now().timestamp(), &payload).unwrap();

        let result = reconciler
            .handle(HandleWebhookCommand {
                payload,
                signature: Some(signature),
            })
            .await;

        assert_eq!(result, Err(WebhookError::InvalidSignature));
        assert_eq!(repo.apply_calls(), 0);
        assert_eq!(stored(&repo, "u1").await, user("u1"));
    }

    #[tokio::test]
    async fn stale_signature_is_rejected() {
        let (reconciler, repo) = setup().await;
        let payload = invoice_paid(Some("u1"), "price_pro");
        let signature = sign_payload(SECRET, chrono::Utc::now().timestamp() - 3600, &payload).unwrap();

        let result = reconciler
            .handle(HandleWebhookCommand {
                payload,
                signature: Some(signature),
            })
            .await;

        assert_eq!(result, Err(WebhookError::TimestampOutOfRange));
        assert_eq!(repo.apply_calls(), 0);
    }

    #[tokio::test]
    async fn signed_garbage_is_malformed_payload() {
        let (reconciler, repo) = setup().await;

        let result = reconciler.handle(signed(b"{not json".to_vec())).await;

        assert!(matches!(result, Err(WebhookError::MalformedPayload(_))));
        assert_eq!(repo.apply_calls(), 0);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // invoice.paid
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn invoice_paid_attaches_subscription() {
        let (reconciler, repo) = setup().await;

        let outcome = reconciler
            .handle(signed(invoice_paid(Some("u1"), "price_unmapped")))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::SubscriptionAttached {
                user_id: UserId::new("u1").unwrap(),
                customer_id: "cus_1".to_string(),
                subscription_id: "sub_1".to_string(),
                plan: "essential".to_string(),
            }
        );
        let record = stored(&repo, "u1").await;
        assert_eq!(record.stripe_customer_id.as_deref(), Some("cus_1"));
        assert_eq!(record.stripe_subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(record.plan.as_deref(), Some("essential"));
        assert!(record.updated_at.as_unix_secs() > 0);
        assert_eq!(stored(&repo, "u2").await, user("u2"));
        assert_eq!(repo.apply_calls(), 1);
    }

    #[tokio::test]
    async fn invoice_paid_maps_known_price_to_plan() {
        let (reconciler, repo) = setup().await;

        reconciler
            .handle(signed(invoice_paid(Some("u1"), "price_pro")))
            .await
            .unwrap();

        assert_eq!(stored(&repo, "u1").await.plan.as_deref(), Some("pro"));
    }

    #[tokio::test]
    async fn invoice_paid_without_user_is_skipped_without_writes() {
        let (reconciler, repo) = setup().await;

        let outcome = reconciler
            .handle(signed(invoice_paid(None, "price_pro")))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::Skipped(WebhookError::incomplete("invoice.paid", vec!["user_id"]))
        );
        assert_eq!(repo.apply_calls(), 0);
    }

    #[tokio::test]
    async fn invoice_paid_reports_every_missing_identifier() {
        let (reconciler, repo) = setup().await;

        let outcome = reconciler
            .handle(signed(event("invoice.paid", json!({ "id": "in_empty" }))))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::Skipped(WebhookError::incomplete(
                "invoice.paid",
                vec!["user_id", "customer_id", "subscription_id"]
            ))
        );
        assert_eq!(repo.apply_calls(), 0);
    }

    #[tokio::test]
    async fn replaying_invoice_paid_is_idempotent() {
        let (reconciler, repo) = setup().await;
        let payload = invoice_paid(Some("u1"), "price_pro");

        reconciler.handle(signed(payload.clone())).await.unwrap();
        let once = stored(&repo, "u1").await;
        reconciler.handle(signed(payload)).await.unwrap();
        let twice = stored(&repo, "u1").await;

        assert_eq!(once.stripe_customer_id, twice.stripe_customer_id);
        assert_eq!(once.stripe_subscription_id, twice.stripe_subscription_id);
        assert_eq!(once.plan, twice.plan);
    }

    #[tokio::test]
    async fn invoice_paid_for_unknown_user_is_skipped() {
        let (reconciler, repo) = setup().await;

        let outcome = reconciler
            .handle(signed(invoice_paid(Some("u404"), "price_pro")))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::Skipped(WebhookError::UnknownUser("u404".to_string()))
        );
        assert_eq!(repo.user_count().await, 2);
    }

    #[tokio::test]
    async fn invoice_paid_writes_user_id_exactly_as_sent() {
        let repo = InMemoryUserBillingRepository::with_records([user("u1 "), user("u1")]).await;
        let reconciler = WebhookReconciler::new(verifier(), Arc::new(repo.clone()), plans());

        let outcome = reconciler
            .handle(signed(invoice_paid(Some("u1 "), "price_pro")))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            ReconcileOutcome::SubscriptionAttached { ref user_id, .. } if user_id.as_str() == "u1 "
        ));
        assert_eq!(stored(&repo, "u1 ").await.plan.as_deref(), Some("pro"));
        assert!(stored(&repo, "u1").await.plan.is_none());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // customer.subscription.deleted
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn subscription_deleted_clears_billing_fields() {
        let (reconciler, repo) = setup().await;
        reconciler
            .handle(signed(invoice_paid(Some("u1"), "price_pro")))
            .await
            .unwrap();

        let outcome = reconciler
            .handle(signed(subscription_deleted(Some("u1"))))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::SubscriptionCleared {
                user_id: UserId::new("u1").unwrap()
            }
        );
        let record = stored(&repo, "u1").await;
        assert!(record.stripe_customer_id.is_none());
        assert!(record.stripe_subscription_id.is_none());
        assert!(record.plan.is_none());
    }

    #[tokio::test]
    async fn subscription_deleted_without_user_is_skipped() {
        let (reconciler, repo) = setup().await;

        let outcome = reconciler
            .handle(signed(subscription_deleted(None)))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            ReconcileOutcome::Skipped(WebhookError::IncompleteEvent { .. })
        ));
        assert_eq!(repo.apply_calls(), 0);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Other events
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unrecognized_event_is_ignored_without_writes() {
        let (reconciler, repo) = setup().await;

        let outcome = reconciler
            .handle(signed(event("customer.created", json!({ "id": "cus_9" }))))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::Ignored {
                event_type: "customer.created".to_string()
            }
        );
        assert_eq!(repo.apply_calls(), 0);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Persistence failures
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn persistence_failure_is_acknowledged_by_default() {
        let reconciler = WebhookReconciler::new(verifier(), Arc::new(FailingRepository), plans());

        let outcome = reconciler
            .handle(signed(invoice_paid(Some("u1"), "price_pro")))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            ReconcileOutcome::Skipped(WebhookError::Persistence(_))
        ));
    }

    #[tokio::test]
    async fn persistence_failure_is_returned_under_reject_policy() {
        let reconciler = WebhookReconciler::new(verifier(), Arc::new(FailingRepository), plans())
            .with_policy(PersistenceFailurePolicy::Reject);

        let result = reconciler
            .handle(signed(subscription_deleted(Some("u1"))))
            .await;

        assert_eq!(reconciler.policy(), PersistenceFailurePolicy::Reject);
        assert!(matches!(result, Err(WebhookError::Persistence(_))));
    }
}
