//! Error types and result handling for webhook ingestion.
//!
//! Defines a coded error taxonomy covering configuration, payload, handshake
//! and persistence failures. No error is retried inside the pipeline; ESPs
//! re-deliver webhooks whose receiving endpoint reports a failure.

use thiserror::Error;

use crate::models::{IntegrationId, ProviderKind, WorkspaceId};

/// Result type alias using `MailhookError`.
pub type Result<T> = std::result::Result<T, MailhookError>;

/// Broad failure classes, used to pick an HTTP status at the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Unknown workspace, unknown integration or unsupported provider.
    Configuration,
    /// The payload could not be decoded into a known notification.
    MalformedPayload,
    /// The SNS subscription confirmation request failed in transport.
    Handshake,
    /// The event store or message-history store rejected a write.
    Persistence,
}

/// Mailhook error types with stable codes.
#[derive(Debug, Error)]
pub enum MailhookError {
    // Configuration errors (E1001-E1003)
    /// Workspace is not known to the directory (E1001).
    #[error("[E1001] Workspace not found: {workspace_id}")]
    WorkspaceNotFound {
        /// The workspace that was looked up
        workspace_id: WorkspaceId,
    },

    /// Integration is not configured in the workspace (E1002).
    #[error("[E1002] Integration not found: {integration_id} in workspace {workspace_id}")]
    IntegrationNotFound {
        /// The workspace that was searched
        workspace_id: WorkspaceId,
        /// The integration that was looked up
        integration_id: IntegrationId,
    },

    /// Integration names a provider with no normalizer (E1003).
    #[error("[E1003] Unsupported provider: {kind}")]
    UnsupportedProvider {
        /// Provider kind as configured on the integration
        kind: String,
    },

    // Payload errors (E2001-E2002)
    /// Payload failed to decode (E2001).
    #[error("[E2001] Malformed {provider} payload: {message}")]
    MalformedPayload {
        /// Provider whose normalizer rejected the payload
        provider: ProviderKind,
        /// Decoder message
        message: String,
    },

    /// Payload decoded but carries an event type the provider never sends
    /// to this endpoint (E2002).
    #[error("[E2002] Unsupported {provider} event type: {event_type}")]
    UnsupportedEventType {
        /// Provider whose normalizer rejected the payload
        provider: ProviderKind,
        /// Event type discriminant found in the payload
        event_type: String,
    },

    // Handshake errors (E3001)
    /// SNS subscription confirmation request failed in transport (E3001).
    #[error("[E3001] Subscription confirmation failed: {message}")]
    SubscriptionConfirmation {
        /// Transport error message
        message: String,
    },

    // Persistence errors (E4001)
    /// Event store or message-history store failure (E4001).
    #[error("[E4001] Storage error: {message}")]
    Storage {
        /// Store error message
        message: String,
    },
}

impl MailhookError {
    /// Creates a malformed payload error.
    pub fn malformed(provider: ProviderKind, message: impl Into<String>) -> Self {
        Self::MalformedPayload { provider, message: message.into() }
    }

    /// Creates an unsupported event type error.
    pub fn unsupported_event(provider: ProviderKind, event_type: impl Into<String>) -> Self {
        Self::UnsupportedEventType { provider, event_type: event_type.into() }
    }

    /// Creates a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage { message: message.into() }
    }

    /// Creates a subscription confirmation error.
    pub fn confirmation(message: impl Into<String>) -> Self {
        Self::SubscriptionConfirmation { message: message.into() }
    }

    /// Returns the error code (E1001-E4001).
    pub const fn code(&self) -> &'static str {
        match self {
            Self::WorkspaceNotFound { .. } => "E1001",
            Self::IntegrationNotFound { .. } => "E1002",
            Self::UnsupportedProvider { .. } => "E1003",
            Self::MalformedPayload { .. } => "E2001",
            Self::UnsupportedEventType { .. } => "E2002",
            Self::SubscriptionConfirmation { .. } => "E3001",
            Self::Storage { .. } => "E4001",
        }
    }

    /// Returns the failure class of this error.
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::WorkspaceNotFound { .. }
            | Self::IntegrationNotFound { .. }
            | Self::UnsupportedProvider { .. } => ErrorCategory::Configuration,
            Self::MalformedPayload { .. } | Self::UnsupportedEventType { .. } => {
                ErrorCategory::MalformedPayload
            },
            Self::SubscriptionConfirmation { .. } => ErrorCategory::Handshake,
            Self::Storage { .. } => ErrorCategory::Persistence,
        }
    }

    /// Returns whether a re-delivery of the same payload by the ESP could
    /// succeed.
    pub const fn is_retryable_by_provider(&self) -> bool {
        matches!(self.category(), ErrorCategory::Handshake | ErrorCategory::Persistence)
    }
}
