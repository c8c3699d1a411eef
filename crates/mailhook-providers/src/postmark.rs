//! Postmark webhooks.
//!
//! Postmark endpoints are provisioned per record type, so a record type this
//! normalizer does not handle points at a misconfigured webhook and is
//! rejected.

use std::collections::HashMap;

use mailhook_core::{CanonicalWebhookEvent, EventKind, MailhookError, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    context::NormalizeContext,
    correlation::{self, Correlated},
    timestamp,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PostmarkPayload {
    record_type: String,
    #[serde(rename = "MessageID", default)]
    message_id: Option<String>,
    #[serde(default)]
    recipient: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    delivered_at: Option<String>,
    #[serde(default)]
    bounced_at: Option<String>,
    #[serde(rename = "Type", default)]
    bounce_type: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, Value>,
}

impl Correlated for PostmarkPayload {
    fn metadata_message_id(&self) -> Option<String> {
        correlation::from_metadata(&self.metadata)
    }

    fn native_message_id(&self) -> Option<String> {
        self.message_id.clone()
    }
}

/// Normalizes a Postmark `Delivery`, `Bounce` or `SpamComplaint` record.
///
/// # Errors
///
/// Returns `MalformedPayload` when the body does not decode and
/// `UnsupportedEventType` for any other record type.
pub fn normalize(ctx: &NormalizeContext<'_>) -> Result<Vec<CanonicalWebhookEvent>> {
    let payload: PostmarkPayload = serde_json::from_slice(ctx.payload)
        .map_err(|e| MailhookError::malformed(ctx.provider, e.to_string()))?;
    let message_id = payload.message_id();

    let event = match payload.record_type.as_str() {
        "Delivery" => ctx.event(
            EventKind::Delivered,
            timestamp::rfc3339_or(payload.delivered_at.as_deref(), ctx.received_at),
            payload.recipient,
            message_id,
        ),
        "Bounce" => {
            // Postmark reports a single `Type` that serves as both type and
            // category.
            let bounce_type = payload.bounce_type.unwrap_or_default();
            let diagnostic = payload
                .details
                .filter(|d| !d.is_empty())
                .or(payload.description)
                .unwrap_or_default();
            ctx.event(
                EventKind::bounce(bounce_type.clone(), bounce_type, diagnostic),
                timestamp::rfc3339_or(payload.bounced_at.as_deref(), ctx.received_at),
                payload.email,
                message_id,
            )
        },
        "SpamComplaint" => ctx.event(
            EventKind::complaint(payload.bounce_type.unwrap_or_else(|| "SpamComplaint".to_string())),
            timestamp::rfc3339_or(payload.bounced_at.as_deref(), ctx.received_at),
            payload.email,
            message_id,
        ),
        other => return Err(MailhookError::unsupported_event(ctx.provider, other)),
    };

    Ok(vec![event])
}
