//! Mailgun webhooks.

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
struct MailgunPayload {
    #[serde(rename = "event-data")]
    event_data: MailgunEventData,
}

#[derive(Debug, Deserialize)]
struct MailgunEventData {
    event: String,
    #[serde(default)]
    timestamp: Option<f64>,
    #[serde(default)]
    recipient: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(rename = "delivery-status", default)]
    delivery_status: MailgunDeliveryStatus,
    #[serde(default)]
    message: MailgunMessage,
    #[serde(rename = "user-variables", default)]
    user_variables: HashMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct MailgunDeliveryStatus {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MailgunMessage {
    #[serde(default)]
    headers: MailgunHeaders,
}

#[derive(Debug, Default, Deserialize)]
struct MailgunHeaders {
    #[serde(rename = "message-id", default)]
    message_id: Option<String>,
}

impl Correlated for MailgunEventData {
    fn metadata_message_id(&self) -> Option<String> {
        correlation::from_metadata(&self.user_variables)
    }

    fn native_message_id(&self) -> Option<String> {
        self.message.headers.message_id.clone()
    }
}

impl MailgunEventData {
    fn diagnostic(&self) -> String {
        [&self.delivery_status.description, &self.delivery_status.message, &self.reason]
            .into_iter()
            .flatten()
            .find(|text| !text.is_empty())
            .cloned()
            .unwrap_or_default()
    }
}

/// Normalizes a Mailgun `delivered`, `failed` or `complained` event.
///
/// The hard/soft split for `failed` comes from `severity`: `permanent` is a
/// hard bounce, anything else soft.
///
/// # Errors
///
/// Returns `MalformedPayload` when the body does not decode and
/// `UnsupportedEventType` for any other event.
pub fn normalize(ctx: &NormalizeContext<'_>) -> Result<Vec<CanonicalWebhookEvent>> {
    let payload: MailgunPayload = serde_json::from_slice(ctx.payload)
        .map_err(|e| MailhookError::malformed(ctx.provider, e.to_string()))?;
    let data = payload.event_data;

    let kind = match data.event.as_str() {
        "delivered" => EventKind::Delivered,
        "failed" => {
            let severity = data.severity.clone().unwrap_or_default();
            let category =
                if severity.eq_ignore_ascii_case("permanent") { "HardBounce" } else { "SoftBounce" };
            EventKind::bounce(severity, category, data.diagnostic())
        },
        "complained" => EventKind::complaint("abuse"),
        other => return Err(MailhookError::unsupported_event(ctx.provider, other)),
    };

    let event = ctx.event(
        kind,
        timestamp::epoch_seconds_or(data.timestamp, ctx.received_at),
        data.recipient.clone(),
        data.message_id(),
    );
    Ok(vec![event])
}
