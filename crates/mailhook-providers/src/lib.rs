//! Provider webhook normalizers.
//!
//! Converts the delivery-status webhooks of six email service providers into
//! [`CanonicalWebhookEvent`](mailhook_core::CanonicalWebhookEvent)s. Each
//! provider module decodes its own wire format; [`Normalizers`] selects the
//! module for a provider and forwards the raw bytes.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use mailhook_core::{IntegrationId, ProviderKind};
//! use mailhook_providers::Normalizers;
//!
//! let payload = Bytes::from_static(
//!     br#"{"event":"delivered","recipient":"a@example.com","messageId":"m-1"}"#,
//! );
//! let normalized = Normalizers::default()
//!     .normalize(ProviderKind::Smtp, &IntegrationId::from("int-1"), &payload)
//!     .unwrap();
//! assert_eq!(normalized.events.len(), 1);
//! assert_eq!(normalized.events[0].message_id.as_deref(), Some("m-1"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
pub mod correlation;
pub mod dispatch;
pub mod mailgun;
pub mod mailjet;
pub mod postmark;
pub mod ses;
pub mod smtp;
pub mod sparkpost;
pub mod timestamp;

pub use context::{NormalizeContext, Normalized, SnsAction};
pub use correlation::Correlated;
pub use dispatch::Normalizers;
