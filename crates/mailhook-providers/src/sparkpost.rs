//! SparkPost webhooks.
//!
//! SparkPost batches events: a payload is a JSON array of wrappers, each
//! holding one event under a category key inside `msys`. Every element is
//! normalized on its own. Event types with no canonical counterpart (opens,
//! clicks, injections, delays) are routine in a batch and are skipped.

use std::collections::HashMap;

use mailhook_core::{CanonicalWebhookEvent, EventKind, MailhookError, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    context::NormalizeContext,
    correlation::{self, Correlated},
    timestamp,
};

#[derive(Debug, Deserialize)]
struct SparkPostWrapper {
    #[serde(default)]
    msys: SparkPostMsys,
}

#[derive(Debug, Default, Deserialize)]
struct SparkPostMsys {
    #[serde(default)]
    message_event: Option<SparkPostEvent>,
    #[serde(default)]
    track_event: Option<SparkPostEvent>,
    #[serde(default)]
    gen_event: Option<SparkPostEvent>,
    #[serde(default)]
    unsubscribe_event: Option<SparkPostEvent>,
    #[serde(default)]
    relay_event: Option<SparkPostEvent>,
}

impl SparkPostMsys {
    fn into_event(self) -> Option<SparkPostEvent> {
        self.message_event
            .or(self.track_event)
            .or(self.gen_event)
            .or(self.unsubscribe_event)
            .or(self.relay_event)
    }
}

#[derive(Debug, Deserialize)]
struct SparkPostEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    timestamp: Option<Value>,
    #[serde(default)]
    rcpt_to: Option<String>,
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    bounce_class: Option<Value>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    raw_reason: Option<String>,
    #[serde(default)]
    fbtype: Option<String>,
    #[serde(alias = "recipient_meta", default)]
    rcpt_meta: HashMap<String, Value>,
}

impl Correlated for SparkPostEvent {
    fn metadata_message_id(&self) -> Option<String> {
        correlation::from_metadata(&self.rcpt_meta)
    }

    fn native_message_id(&self) -> Option<String> {
        self.message_id.clone()
    }
}

/// Normalizes a SparkPost batch.
///
/// # Errors
///
/// Returns `MalformedPayload` when the body is not an array of event
/// wrappers.
pub fn normalize(ctx: &NormalizeContext<'_>) -> Result<Vec<CanonicalWebhookEvent>> {
    let batch: Vec<SparkPostWrapper> = serde_json::from_slice(ctx.payload)
        .map_err(|e| MailhookError::malformed(ctx.provider, e.to_string()))?;

    let events = batch
        .into_iter()
        .filter_map(|wrapper| wrapper.msys.into_event())
        .filter_map(|event| normalize_event(ctx, event))
        .collect();
    Ok(events)
}

fn normalize_event(ctx: &NormalizeContext<'_>, event: SparkPostEvent) -> Option<CanonicalWebhookEvent> {
    let kind = match event.event_type.as_str() {
        "delivery" => EventKind::Delivered,
        "bounce" | "out_of_band" => {
            // The numeric bounce class goes to the classifier untouched.
            let bounce_class =
                event.bounce_class.as_ref().and_then(correlation::scalar_to_string).unwrap_or_default();
            let diagnostic =
                event.raw_reason.clone().or_else(|| event.reason.clone()).unwrap_or_default();
            EventKind::bounce(event.event_type.clone(), bounce_class, diagnostic)
        },
        "spam_complaint" => {
            EventKind::complaint(event.fbtype.clone().unwrap_or_else(|| "abuse".to_string()))
        },
        other => {
            debug!(event_type = other, "Skipping SparkPost event with no canonical type");
            return None;
        },
    };

    Some(ctx.event(
        kind,
        timestamp::rfc3339_or_epoch_or(event.timestamp.as_ref(), ctx.received_at),
        event.rcpt_to.clone(),
        event.message_id(),
    ))
}
