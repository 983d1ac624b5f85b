//! Response bodies for the webhook endpoint.

use serde::{Deserialize, Serialize};

/// Body returned whenever Stripe should consider the delivery handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self { received: true }
    }
}
