//! Core domain models and classification rules.
//!
//! Provides the canonical webhook event model every provider notification is
//! normalized into, the status-transition command derived from it, the error
//! taxonomy shared by all crates, and the bounce severity classifier.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bounce;
pub mod error;
pub mod models;
pub mod time;

pub use bounce::{classify_bounce, is_hard_bounce, BounceSeverity};
pub use error::{ErrorCategory, MailhookError, Result};
pub use models::{
    BounceDetails, CanonicalWebhookEvent, ComplaintDetails, EventId, EventKind, IntegrationId,
    MessageEvent, MessageEventUpdate, ProviderKind, WebhookEventType, WorkspaceId,
    CORRELATION_METADATA_KEY, STATUS_INFO_MAX_CHARS,
};
pub use time::{Clock, RealClock, TestClock};
