//! Generic SMTP relay webhooks.
//!
//! Relays post one event per request in a fixed schema with explicit event,
//! timestamp, recipient and message id fields.

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
struct SmtpPayload {
    event: String,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    recipient: Option<String>,
    #[serde(rename = "messageId", alias = "message_id", default)]
    message_id: Option<String>,
    #[serde(default)]
    bounce_type: Option<String>,
    #[serde(default)]
    bounce_category: Option<String>,
    #[serde(default)]
    diagnostic: Option<String>,
    #[serde(default)]
    complaint_type: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, Value>,
}

impl Correlated for SmtpPayload {
    fn metadata_message_id(&self) -> Option<String> {
        correlation::from_metadata(&self.metadata)
    }

    fn native_message_id(&self) -> Option<String> {
        self.message_id.clone()
    }
}

/// Normalizes an SMTP relay event.
///
/// # Errors
///
/// Returns `MalformedPayload` when the body does not decode and
/// `UnsupportedEventType` for events other than delivery, bounce and
/// complaint.
pub fn normalize(ctx: &NormalizeContext<'_>) -> Result<Vec<CanonicalWebhookEvent>> {
    let payload: SmtpPayload = serde_json::from_slice(ctx.payload)
        .map_err(|e| MailhookError::malformed(ctx.provider, e.to_string()))?;
    let message_id = payload.message_id();

    let kind = match payload.event.to_ascii_lowercase().as_str() {
        "delivered" | "delivery" => EventKind::Delivered,
        "bounce" | "bounced" => EventKind::bounce(
            payload.bounce_type.unwrap_or_default(),
            payload.bounce_category.unwrap_or_default(),
            payload.diagnostic.unwrap_or_default(),
        ),
        "complaint" | "complained" => {
            EventKind::complaint(payload.complaint_type.unwrap_or_else(|| "abuse".to_string()))
        },
        _ => return Err(MailhookError::unsupported_event(ctx.provider, payload.event)),
    };

    Ok(vec![ctx.event(
        kind,
        timestamp::rfc3339_or(payload.timestamp.as_deref(), ctx.received_at),
        payload.recipient,
        message_id,
    )])
}
