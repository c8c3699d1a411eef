//! Core domain models and strongly-typed identifiers.
//!
//! Defines the canonical webhook event every provider payload is reduced to,
//! the status-transition command derived from it, and newtype wrappers for
//! the identifiers the pipeline passes around.

use std::{fmt, str::FromStr};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MailhookError;

/// Maximum number of characters kept in [`MessageEventUpdate::status_info`].
///
/// Matches the width of the persisted status column.
pub const STATUS_INFO_MAX_CHARS: usize = 255;

/// Metadata key under which outbound sends attach the internal message id.
pub const CORRELATION_METADATA_KEY: &str = "notifuse_message_id";

/// Strongly-typed canonical event identifier.
///
/// Assigned when a notification is normalized, independent of any identifier
/// the provider attached.
///
/// # Example
///
/// ```
/// use mailhook_core::models::EventId;
/// let event_id = EventId::new();
/// println!("Normalized event: {}", event_id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EventId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Workspace identifier, opaque to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceId(pub String);

/// Integration identifier, opaque to the pipeline.
///
/// An integration binds a workspace to one configured email provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntegrationId(pub String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(WorkspaceId);
string_id!(IntegrationId);

/// Email service providers with a webhook normalizer.
///
/// Closed set: adding a provider means adding a variant, and every `match`
/// over this enum must then handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Amazon SES, notified through SNS.
    Ses,
    /// Postmark.
    Postmark,
    /// Mailgun.
    Mailgun,
    /// SparkPost.
    SparkPost,
    /// Mailjet.
    Mailjet,
    /// Generic SMTP relay posting a fixed JSON schema.
    Smtp,
}

impl ProviderKind {
    /// All supported providers, in declaration order.
    pub const ALL: [Self; 6] =
        [Self::Ses, Self::Postmark, Self::Mailgun, Self::SparkPost, Self::Mailjet, Self::Smtp];

    /// Returns the lowercase configuration name of the provider.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ses => "ses",
            Self::Postmark => "postmark",
            Self::Mailgun => "mailgun",
            Self::SparkPost => "sparkpost",
            Self::Mailjet => "mailjet",
            Self::Smtp => "smtp",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = MailhookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| MailhookError::UnsupportedProvider { kind: s.to_string() })
    }
}

/// Canonical event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    /// The receiving server accepted the message.
    Delivered,
    /// The message bounced, hard or soft.
    Bounce,
    /// The recipient reported the message as unwanted.
    Complaint,
}

impl fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered => write!(f, "delivered"),
            Self::Bounce => write!(f, "bounce"),
            Self::Complaint => write!(f, "complaint"),
        }
    }
}

/// Bounce-only fields, provider specific free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BounceDetails {
    /// Provider bounce type, e.g. `Permanent` or `HardBounce`.
    pub bounce_type: String,
    /// Provider bounce category or sub-type, e.g. `General` or `21`.
    pub bounce_category: String,
    /// Diagnostic text reported by the receiving server.
    pub bounce_diagnostic: String,
}

/// Complaint-only fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintDetails {
    /// Feedback type reported by the provider, e.g. `abuse`.
    pub complaint_feedback_type: String,
}

/// Event type together with the fields only that type carries.
///
/// Bounce and complaint details live inside their variant, so a delivered
/// event cannot carry either group and a bounce cannot carry complaint data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Delivery confirmation.
    Delivered,
    /// Bounce with provider classification.
    Bounce(BounceDetails),
    /// Complaint with feedback type.
    Complaint(ComplaintDetails),
}

impl EventKind {
    /// Creates a bounce kind from its three provider fields.
    pub fn bounce(
        bounce_type: impl Into<String>,
        bounce_category: impl Into<String>,
        bounce_diagnostic: impl Into<String>,
    ) -> Self {
        Self::Bounce(BounceDetails {
            bounce_type: bounce_type.into(),
            bounce_category: bounce_category.into(),
            bounce_diagnostic: bounce_diagnostic.into(),
        })
    }

    /// Creates a complaint kind from its feedback type.
    pub fn complaint(feedback_type: impl Into<String>) -> Self {
        Self::Complaint(ComplaintDetails { complaint_feedback_type: feedback_type.into() })
    }

    /// Returns the plain event type.
    pub const fn event_type(&self) -> WebhookEventType {
        match self {
            Self::Delivered => WebhookEventType::Delivered,
            Self::Bounce(_) => WebhookEventType::Bounce,
            Self::Complaint(_) => WebhookEventType::Complaint,
        }
    }
}

/// Canonical record of one inbound provider notification.
///
/// Created once during normalization and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalWebhookEvent {
    /// Generated identifier.
    pub id: EventId,
    /// Event type with its type-specific fields.
    #[serde(flatten)]
    pub kind: EventKind,
    /// Provider that sent the notification.
    pub provider: ProviderKind,
    /// Integration the notification arrived on.
    pub integration_id: IntegrationId,
    /// Recipient address, absent for some control messages.
    pub recipient_email: Option<String>,
    /// Correlation key used to find the delivery-history record.
    pub message_id: Option<String>,
    /// Event time reported by the provider, or ingestion time.
    pub timestamp: DateTime<Utc>,
    /// The notification bytes exactly as received.
    #[serde(with = "raw_payload")]
    pub raw_payload: Bytes,
}

impl CanonicalWebhookEvent {
    /// Creates an event with a fresh identifier and no recipient or message
    /// id.
    pub fn new(
        kind: EventKind,
        provider: ProviderKind,
        integration_id: IntegrationId,
        timestamp: DateTime<Utc>,
        raw_payload: Bytes,
    ) -> Self {
        Self {
            id: EventId::new(),
            kind,
            provider,
            integration_id,
            recipient_email: None,
            message_id: None,
            timestamp,
            raw_payload,
        }
    }

    /// Sets the recipient address, ignoring empty values.
    pub fn with_recipient(mut self, recipient: Option<String>) -> Self {
        self.recipient_email = recipient.filter(|r| !r.is_empty());
        self
    }

    /// Sets the correlation key, ignoring empty values.
    pub fn with_message_id(mut self, message_id: Option<String>) -> Self {
        self.message_id = message_id.filter(|id| !id.is_empty());
        self
    }

    /// Returns the plain event type.
    pub const fn event_type(&self) -> WebhookEventType {
        self.kind.event_type()
    }

    /// Returns the bounce fields if this is a bounce.
    pub fn bounce(&self) -> Option<&BounceDetails> {
        match &self.kind {
            EventKind::Bounce(details) => Some(details),
            _ => None,
        }
    }

    /// Returns the complaint fields if this is a complaint.
    pub fn complaint(&self) -> Option<&ComplaintDetails> {
        match &self.kind {
            EventKind::Complaint(details) => Some(details),
            _ => None,
        }
    }

    /// Compares every field except the generated identifier.
    pub fn eq_ignoring_id(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.provider == other.provider
            && self.integration_id == other.integration_id
            && self.recipient_email == other.recipient_email
            && self.message_id == other.message_id
            && self.timestamp == other.timestamp
            && self.raw_payload == other.raw_payload
    }
}

/// Message status recorded on the delivery-history record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageEvent {
    /// Message was delivered.
    Delivered,
    /// Message hard-bounced.
    Bounced,
    /// Recipient complained.
    Complained,
}

impl fmt::Display for MessageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered => write!(f, "delivered"),
            Self::Bounced => write!(f, "bounced"),
            Self::Complained => write!(f, "complained"),
        }
    }
}

/// Status-transition command applied by the message-history store.
///
/// Built per ingestion call and consumed once; the store only applies it if
/// the message has no status recorded for `event` yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEventUpdate {
    /// Internal message identifier.
    pub message_id: String,
    /// Status to record.
    pub event: MessageEvent,
    /// When the status was reached.
    pub timestamp: DateTime<Utc>,
    /// Diagnostic text, at most [`STATUS_INFO_MAX_CHARS`] characters.
    pub status_info: Option<String>,
}

impl MessageEventUpdate {
    /// Creates an update without status information.
    pub fn new(message_id: impl Into<String>, event: MessageEvent, timestamp: DateTime<Utc>) -> Self {
        Self { message_id: message_id.into(), event, timestamp, status_info: None }
    }

    /// Attaches status information, truncated to the column width.
    pub fn with_status_info(mut self, info: &str) -> Self {
        self.status_info = Some(truncate_status_info(info));
        self
    }
}

/// Truncates `info` to at most [`STATUS_INFO_MAX_CHARS`] characters.
///
/// Counts characters, not bytes, so multi-byte diagnostics are never split.
pub fn truncate_status_info(info: &str) -> String {
    match info.char_indices().nth(STATUS_INFO_MAX_CHARS) {
        Some((byte_index, _)) => info[..byte_index].to_string(),
        None => info.to_string(),
    }
}

mod raw_payload {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(payload: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(payload))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Bytes::from(text))
    }
}
