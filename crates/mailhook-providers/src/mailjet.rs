//! Mailjet webhooks.
//!
//! Mailjet posts either a single event object or, with grouping enabled, an
//! array of them. The payload shape is probed before decoding and every
//! event then goes through the same per-event conversion.

use std::collections::HashMap;

use mailhook_core::{CanonicalWebhookEvent, EventKind, MailhookError, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    context::NormalizeContext,
    correlation::{self, Correlated},
    timestamp,
};

/// Accepted payload shapes, in the order they are probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailjetShape {
    /// JSON array of event objects.
    Batch,
    /// A single event object.
    Single,
}

impl MailjetShape {
    /// Probe order for payload bodies.
    pub const PROBE_ORDER: [Self; 2] = [Self::Batch, Self::Single];

    /// Whether `body` has this shape.
    pub fn matches(self, body: &Value) -> bool {
        match self {
            Self::Batch => body.is_array(),
            Self::Single => body.is_object(),
        }
    }

    /// Returns the first shape `body` matches.
    pub fn probe(body: &Value) -> Option<Self> {
        Self::PROBE_ORDER.into_iter().find(|shape| shape.matches(body))
    }
}

#[derive(Debug, Deserialize)]
struct MailjetEvent {
    event: String,
    #[serde(default)]
    time: Option<f64>,
    #[serde(default)]
    email: Option<String>,
    #[serde(rename = "MessageID", default)]
    message_id: Option<Value>,
    #[serde(rename = "Message_GUID", default)]
    message_guid: Option<String>,
    #[serde(rename = "CustomID", default)]
    custom_id: Option<String>,
    #[serde(rename = "Payload", default)]
    payload: Option<String>,
    #[serde(alias = "HardBounce", default)]
    hard_bounce: Option<bool>,
    #[serde(default)]
    error_related_to: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    comment: Option<String>,
}

impl Correlated for MailjetEvent {
    fn metadata_message_id(&self) -> Option<String> {
        self.custom_id.clone().filter(|id| !id.is_empty()).or_else(|| {
            let payload = self.payload.as_deref()?;
            let metadata: HashMap<String, Value> = serde_json::from_str(payload).ok()?;
            correlation::from_metadata(&metadata)
        })
    }

    fn native_message_id(&self) -> Option<String> {
        self.message_id
            .as_ref()
            .and_then(correlation::scalar_to_string)
            .filter(|id| id != "0")
            .or_else(|| self.message_guid.clone())
    }
}

impl MailjetEvent {
    fn diagnostic(&self) -> String {
        [&self.error, &self.comment]
            .into_iter()
            .flatten()
            .find(|text| !text.is_empty())
            .cloned()
            .unwrap_or_default()
    }
}

/// Normalizes a Mailjet event or event batch.
///
/// # Errors
///
/// Returns `MalformedPayload` when the body is neither an event object nor
/// an array of them, and `UnsupportedEventType` for events other than
/// `sent`, `bounce`, `blocked`, `spam` and `unsub`.
pub fn normalize(ctx: &NormalizeContext<'_>) -> Result<Vec<CanonicalWebhookEvent>> {
    decode(ctx)?.into_iter().map(|event| normalize_event(ctx, event)).collect()
}

fn decode(ctx: &NormalizeContext<'_>) -> Result<Vec<MailjetEvent>> {
    let malformed = |e: serde_json::Error| MailhookError::malformed(ctx.provider, e.to_string());
    let body: Value = serde_json::from_slice(ctx.payload).map_err(malformed)?;

    match MailjetShape::probe(&body) {
        Some(MailjetShape::Batch) => serde_json::from_value(body).map_err(malformed),
        Some(MailjetShape::Single) => serde_json::from_value(body).map(|e| vec![e]).map_err(malformed),
        None => Err(MailhookError::malformed(ctx.provider, "expected an event object or array")),
    }
}

fn normalize_event(ctx: &NormalizeContext<'_>, event: MailjetEvent) -> Result<CanonicalWebhookEvent> {
    let kind = match event.event.as_str() {
        "sent" => EventKind::Delivered,
        "bounce" => {
            let bounce_type =
                if event.hard_bounce.unwrap_or(false) { "HardBounce" } else { "SoftBounce" };
            EventKind::bounce(
                bounce_type,
                event.error_related_to.clone().unwrap_or_default(),
                event.diagnostic(),
            )
        },
        "blocked" => EventKind::bounce(
            "Blocked",
            event.error_related_to.clone().unwrap_or_default(),
            event.diagnostic(),
        ),
        "spam" | "unsub" => EventKind::complaint(event.event.clone()),
        other => return Err(MailhookError::unsupported_event(ctx.provider, other)),
    };

    Ok(ctx.event(
        kind,
        timestamp::epoch_seconds_or(event.time, ctx.received_at),
        event.email.clone(),
        event.message_id(),
    ))
}
