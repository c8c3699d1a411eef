//! Shared normalization inputs and outputs.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use mailhook_core::{CanonicalWebhookEvent, EventKind, IntegrationId, ProviderKind};

/// Inputs common to every normalizer.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext<'a> {
    /// Provider whose normalizer is running.
    pub provider: ProviderKind,
    /// Integration the payload arrived on.
    pub integration_id: &'a IntegrationId,
    /// The payload exactly as received.
    pub payload: &'a Bytes,
    /// Ingestion time, the fallback for unparsable provider timestamps.
    pub received_at: DateTime<Utc>,
}

impl<'a> NormalizeContext<'a> {
    /// Creates a context for one payload.
    pub fn new(
        provider: ProviderKind,
        integration_id: &'a IntegrationId,
        payload: &'a Bytes,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self { provider, integration_id, payload, received_at }
    }

    /// Builds a canonical event carrying this context's provider,
    /// integration and raw payload.
    pub fn event(
        &self,
        kind: EventKind,
        timestamp: DateTime<Utc>,
        recipient: Option<String>,
        message_id: Option<String>,
    ) -> CanonicalWebhookEvent {
        CanonicalWebhookEvent::new(
            kind,
            self.provider,
            self.integration_id.clone(),
            timestamp,
            self.payload.clone(),
        )
        .with_recipient(recipient)
        .with_message_id(message_id)
    }
}

/// Control-plane action requested by a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnsAction {
    /// Complete the SNS subscription handshake with a GET to `url`.
    ConfirmSubscription {
        /// Confirmation URL supplied by SNS.
        url: String,
        /// Topic the subscription belongs to, when reported.
        topic_arn: Option<String>,
    },
}

/// Result of normalizing one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    /// Canonical events, possibly none.
    pub events: Vec<CanonicalWebhookEvent>,
    /// Control-plane action to perform, SES only.
    pub action: Option<SnsAction>,
}

impl Normalized {
    /// Wraps data events with no control action.
    pub fn events(events: Vec<CanonicalWebhookEvent>) -> Self {
        Self { events, action: None }
    }

    /// A payload that carries nothing to record.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A control message requesting `action` and carrying no events.
    pub fn action(action: SnsAction) -> Self {
        Self { events: Vec::new(), action: Some(action) }
    }
}
