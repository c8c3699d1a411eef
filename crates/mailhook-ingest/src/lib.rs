//! Webhook ingestion for email provider delivery notifications.
//!
//! [`WebhookEventService`] takes a raw webhook body for a workspace
//! integration and records what it says: canonical events go to the
//! [`EventStore`], and status transitions derived by the [`projector`] go to
//! the [`MessageHistoryStore`], which applies each only if that status is not
//! yet set. The SNS subscription handshake is performed through a
//! [`SubscriptionConfirmer`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod confirm;
pub mod projector;
pub mod service;
pub mod storage;
pub mod telemetry;

pub use config::Config;
pub use confirm::{
    ConfirmationOutcome, ConfirmerConfig, HttpSubscriptionConfirmer, RecordingConfirmer,
    SubscriptionConfirmer,
};
pub use projector::project;
pub use service::{ProcessingSummary, WebhookEventService};
pub use storage::{EventStore, MessageHistoryStore, WorkspaceDirectory};
