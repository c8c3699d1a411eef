//! Amazon SES notifications delivered through SNS.
//!
//! SNS wraps every SES notification in an envelope whose `Type` tells data
//! messages apart from subscription control messages. The SES notification
//! itself travels as a JSON string in `Message`.
//!
//! Unrecognized notification bodies produce no events and no error. SNS
//! disables a subscription whose endpoint keeps failing, which would drop
//! every later notification on the topic.

use std::collections::HashMap;

use mailhook_core::{CanonicalWebhookEvent, EventKind, MailhookError, Result};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    context::{NormalizeContext, Normalized, SnsAction},
    correlation::{self, Correlated},
    timestamp,
};

/// Heartbeat SES publishes when an SNS topic is attached to a configuration
/// set.
pub const TOPIC_VALIDATION_MESSAGE: &str =
    "Successfully validated SNS topic for Amazon SES event publishing.";

/// SES notification kinds, in the order they are probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SesNotificationKind {
    /// `Bounce` notification.
    Bounce,
    /// `Complaint` notification.
    Complaint,
    /// `Delivery` notification.
    Delivery,
}

impl SesNotificationKind {
    /// Probe order for notification bodies.
    pub const PROBE_ORDER: [Self; 3] = [Self::Bounce, Self::Complaint, Self::Delivery];

    /// Discriminant value SES writes for this kind.
    pub const fn discriminant(self) -> &'static str {
        match self {
            Self::Bounce => "Bounce",
            Self::Complaint => "Complaint",
            Self::Delivery => "Delivery",
        }
    }

    /// Returns the first kind whose discriminant matches the body.
    pub fn probe(body: &Value) -> Option<Self> {
        let discriminant = body
            .get("notificationType")
            .or_else(|| body.get("eventType"))
            .and_then(Value::as_str)?;
        Self::PROBE_ORDER.into_iter().find(|kind| kind.discriminant() == discriminant)
    }
}

#[derive(Debug, Deserialize)]
struct SnsEnvelope {
    #[serde(rename = "Type", alias = "type")]
    kind: String,
    #[serde(rename = "Message", alias = "message", default)]
    message: String,
    #[serde(rename = "SubscribeURL", alias = "subscribeUrl", alias = "SubscribeUrl", default)]
    subscribe_url: Option<String>,
    #[serde(rename = "TopicArn", alias = "topicArn", default)]
    topic_arn: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SesMail {
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    tags: HashMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SesBounceNotification {
    #[serde(default)]
    mail: SesMail,
    bounce: SesBounce,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SesBounce {
    #[serde(default)]
    bounce_type: String,
    #[serde(default)]
    bounce_sub_type: String,
    #[serde(default)]
    bounced_recipients: Vec<SesBouncedRecipient>,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SesBouncedRecipient {
    email_address: String,
    #[serde(default)]
    diagnostic_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SesComplaintNotification {
    #[serde(default)]
    mail: SesMail,
    complaint: SesComplaint,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SesComplaint {
    #[serde(default)]
    complained_recipients: Vec<SesRecipient>,
    #[serde(default)]
    complaint_feedback_type: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SesRecipient {
    email_address: String,
}

#[derive(Debug, Deserialize)]
struct SesDeliveryNotification {
    #[serde(default)]
    mail: SesMail,
    delivery: SesDelivery,
}

#[derive(Debug, Deserialize)]
struct SesDelivery {
    #[serde(default)]
    recipients: Vec<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

impl Correlated for SesMail {
    fn metadata_message_id(&self) -> Option<String> {
        correlation::from_tag_lists(&self.tags)
    }

    fn native_message_id(&self) -> Option<String> {
        self.message_id.clone()
    }
}

/// Normalizes an SNS envelope.
///
/// Subscription confirmations produce a [`SnsAction::ConfirmSubscription`]
/// for the caller to perform; they carry no events.
///
/// # Errors
///
/// Returns `MalformedPayload` when the envelope itself cannot be decoded or
/// a subscription confirmation carries no URL.
pub fn normalize(ctx: &NormalizeContext<'_>) -> Result<Normalized> {
    let envelope: SnsEnvelope = serde_json::from_slice(ctx.payload)
        .map_err(|e| MailhookError::malformed(ctx.provider, e.to_string()))?;

    match envelope.kind.as_str() {
        "SubscriptionConfirmation" => {
            let url = envelope
                .subscribe_url
                .filter(|url| !url.is_empty())
                .ok_or_else(|| MailhookError::malformed(ctx.provider, "missing SubscribeURL"))?;
            debug!(topic_arn = ?envelope.topic_arn, "SNS subscription confirmation requested");
            Ok(Normalized::action(SnsAction::ConfirmSubscription {
                url,
                topic_arn: envelope.topic_arn,
            }))
        },
        "UnsubscribeConfirmation" => {
            debug!(topic_arn = ?envelope.topic_arn, "SNS unsubscribe confirmation ignored");
            Ok(Normalized::empty())
        },
        _ if envelope.message.contains(TOPIC_VALIDATION_MESSAGE) => {
            debug!(topic_arn = ?envelope.topic_arn, "SES topic validation heartbeat ignored");
            Ok(Normalized::empty())
        },
        _ => Ok(Normalized::events(normalize_notification(ctx, &envelope.message))),
    }
}

fn normalize_notification(ctx: &NormalizeContext<'_>, message: &str) -> Vec<CanonicalWebhookEvent> {
    let body: Value = match serde_json::from_str(message) {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "SES notification body is not JSON, dropping");
            return Vec::new();
        },
    };

    let Some(kind) = SesNotificationKind::probe(&body) else {
        warn!("Unrecognized SES notification type, dropping");
        return Vec::new();
    };

    let events = match kind {
        SesNotificationKind::Bounce => decode(body, kind).map(|n| bounce_events(ctx, n)),
        SesNotificationKind::Complaint => decode(body, kind).map(|n| complaint_events(ctx, n)),
        SesNotificationKind::Delivery => decode(body, kind).map(|n| delivery_events(ctx, n)),
    };
    events.unwrap_or_default()
}

fn decode<T: DeserializeOwned>(body: Value, kind: SesNotificationKind) -> Option<T> {
    match serde_json::from_value(body) {
        Ok(notification) => Some(notification),
        Err(e) => {
            warn!(kind = kind.discriminant(), error = %e, "SES notification failed to decode, dropping");
            None
        },
    }
}

fn bounce_events(
    ctx: &NormalizeContext<'_>,
    notification: SesBounceNotification,
) -> Vec<CanonicalWebhookEvent> {
    let SesBounceNotification { mail, bounce } = notification;
    let message_id = mail.message_id();
    let timestamp = timestamp::rfc3339_or(
        bounce.timestamp.as_deref().or(mail.timestamp.as_deref()),
        ctx.received_at,
    );
    let kind_for = |diagnostic: Option<&str>| {
        EventKind::bounce(&bounce.bounce_type, &bounce.bounce_sub_type, diagnostic.unwrap_or_default())
    };

    if bounce.bounced_recipients.is_empty() {
        return vec![ctx.event(kind_for(None), timestamp, None, message_id)];
    }

    bounce
        .bounced_recipients
        .iter()
        .map(|recipient| {
            ctx.event(
                kind_for(recipient.diagnostic_code.as_deref()),
                timestamp,
                Some(recipient.email_address.clone()),
                message_id.clone(),
            )
        })
        .collect()
}

fn complaint_events(
    ctx: &NormalizeContext<'_>,
    notification: SesComplaintNotification,
) -> Vec<CanonicalWebhookEvent> {
    let SesComplaintNotification { mail, complaint } = notification;
    let message_id = mail.message_id();
    let timestamp = timestamp::rfc3339_or(
        complaint.timestamp.as_deref().or(mail.timestamp.as_deref()),
        ctx.received_at,
    );
    let kind = EventKind::complaint(complaint.complaint_feedback_type.unwrap_or_default());

    let recipients: Vec<Option<String>> = if complaint.complained_recipients.is_empty() {
        vec![None]
    } else {
        complaint.complained_recipients.into_iter().map(|r| Some(r.email_address)).collect()
    };

    recipients
        .into_iter()
        .map(|recipient| ctx.event(kind.clone(), timestamp, recipient, message_id.clone()))
        .collect()
}

fn delivery_events(
    ctx: &NormalizeContext<'_>,
    notification: SesDeliveryNotification,
) -> Vec<CanonicalWebhookEvent> {
    let SesDeliveryNotification { mail, delivery } = notification;
    let message_id = mail.message_id();
    let timestamp = timestamp::rfc3339_or(
        delivery.timestamp.as_deref().or(mail.timestamp.as_deref()),
        ctx.received_at,
    );

    let recipients: Vec<Option<String>> = if delivery.recipients.is_empty() {
        vec![None]
    } else {
        delivery.recipients.into_iter().map(Some).collect()
    };

    recipients
        .into_iter()
        .map(|recipient| ctx.event(EventKind::Delivered, timestamp, recipient, message_id.clone()))
        .collect()
}
