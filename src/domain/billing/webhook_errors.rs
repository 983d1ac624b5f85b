//! Webhook error types for Stripe webhook handling.
//!
//! Defines every failure the reconciler can signal, grouped into the four
//! categories the HTTP layer cares about, with status code mapping and
//! retryability semantics.

use http::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors that occur during webhook processing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WebhookError {
    /// The request carried no Stripe-Signature header.
    #[error("Missing Stripe-Signature header")]
    MissingSignature,

    /// The Stripe-Signature header could not be parsed.
    #[error("Malformed signature header: {0}")]
    MalformedSignatureHeader(String),

    /// No v1 signature in the header matches the payload.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signature timestamp is older than the tolerance window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Signature timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Authenticated payload is not a Stripe event.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// A recognized event lacks identifiers required to reconcile it.
    #[error("Incomplete {event_type} event: missing {}", .missing.join(", "))]
    IncompleteEvent {
        event_type: String,
        missing: Vec<&'static str>,
    },

    /// The event names a user that does not exist in storage.
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// The billing update could not be written.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// Coarse grouping of [`WebhookError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Origin of the request could not be established.
    Authentication,
    /// Payload is not a parsable event.
    MalformedPayload,
    /// Event can never be reconciled; retrying is futile.
    IncompleteEvent,
    /// Storage failed while applying a valid event.
    Persistence,
}

/// What to tell Stripe when a storage write fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceFailurePolicy {
    /// Log the failure and answer 200; Stripe will not redeliver.
    #[default]
    Acknowledge,
    /// Answer 500 so Stripe redelivers the event later.
    Reject,
}

impl WebhookError {
    /// Creates an incomplete event error.
    pub fn incomplete(event_type: impl Into<String>, missing: Vec<&'static str>) -> Self {
        WebhookError::IncompleteEvent {
            event_type: event_type.into(),
            missing,
        }
    }

    /// Returns the category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            WebhookError::MissingSignature
            | WebhookError::MalformedSignatureHeader(_)
            | WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp => ErrorCategory::Authentication,
            WebhookError::MalformedPayload(_) => ErrorCategory::MalformedPayload,
            WebhookError::IncompleteEvent { .. } | WebhookError::UnknownUser(_) => {
                ErrorCategory::IncompleteEvent
            }
            WebhookError::Persistence(_) => ErrorCategory::Persistence,
        }
    }

    /// Returns true if the event should be answered with success despite the error.
    pub fn is_acknowledged(&self, policy: PersistenceFailurePolicy) -> bool {
        match self.category() {
            ErrorCategory::IncompleteEvent => true,
            ErrorCategory::Persistence => policy == PersistenceFailurePolicy::Acknowledge,
            ErrorCategory::Authentication | ErrorCategory::MalformedPayload => false,
        }
    }

    /// Maps the error to an HTTP status code.
    ///
    /// Status codes determine Stripe's retry behavior:
    /// - 2xx: Event acknowledged, no retry
    /// - 4xx: Rejected, surfaced to the endpoint operator
    /// - 5xx: Server error, will retry
    pub fn status_code(&self) -> StatusCode {
        match self.category() {
            ErrorCategory::Authentication => StatusCode::BAD_REQUEST,
            ErrorCategory::MalformedPayload => StatusCode::BAD_REQUEST,
            ErrorCategory::IncompleteEvent => StatusCode::OK,
            ErrorCategory::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // Display
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn invalid_signature_displays_correctly() {
        assert_eq!(WebhookError::InvalidSignature.to_string(), "Invalid signature");
    }

    #[test]
    fn incomplete_event_lists_missing_fields() {
        let err = WebhookError::incomplete("invoice.paid", vec!["user_id", "customer_id"]);
        assert_eq!(
            err.to_string(),
            "Incomplete invoice.paid event: missing user_id, customer_id"
        );
    }

    #[test]
    fn malformed_payload_displays_message() {
        let err = WebhookError::MalformedPayload("expected value at line 1".to_string());
        assert_eq!(err.to_string(), "Malformed payload: expected value at line 1");
    }

    // ══════════════════════════════════════════════════════════════
    // Categories
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn signature_failures_are_authentication_errors() {
        for err in [
            WebhookError::MissingSignature,
            WebhookError::MalformedSignatureHeader("missing timestamp".to_string()),
            WebhookError::InvalidSignature,
            WebhookError::TimestampOutOfRange,
            WebhookError::InvalidTimestamp,
        ] {
            assert_eq!(err.category(), ErrorCategory::Authentication);
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn malformed_payload_returns_bad_request() {
        let err = WebhookError::MalformedPayload("eof".to_string());
        assert_eq!(err.category(), ErrorCategory::MalformedPayload);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_user_is_treated_as_incomplete() {
        let err = WebhookError::UnknownUser("u404".to_string());
        assert_eq!(err.category(), ErrorCategory::IncompleteEvent);
        assert_eq!(err.status_code(), StatusCode::OK);
    }

    // ══════════════════════════════════════════════════════════════
    // Acknowledgement
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn incomplete_events_are_always_acknowledged() {
        let err = WebhookError::incomplete("customer.subscription.deleted", vec!["user_id"]);
        assert!(err.is_acknowledged(PersistenceFailurePolicy::Acknowledge));
        assert!(err.is_acknowledged(PersistenceFailurePolicy::Reject));
    }

    #[test]
    fn persistence_acknowledgement_follows_policy() {
        let err = WebhookError::Persistence("deadlock".to_string());
        assert!(err.is_acknowledged(PersistenceFailurePolicy::Acknowledge));
        assert!(!err.is_acknowledged(PersistenceFailurePolicy::Reject));
    }

    #[test]
    fn authentication_errors_are_never_acknowledged() {
        assert!(!WebhookError::MissingSignature.is_acknowledged(PersistenceFailurePolicy::Acknowledge));
    }

    #[test]
    fn policy_deserializes_from_lowercase() {
        let policy: PersistenceFailurePolicy = serde_json::from_str("\"reject\"").unwrap();
        assert_eq!(policy, PersistenceFailurePolicy::Reject);
        assert_eq!(PersistenceFailurePolicy::default(), PersistenceFailurePolicy::Acknowledge);
    }
}
