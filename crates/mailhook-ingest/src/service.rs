//! Webhook event service.
//!
//! Orchestrates one inbound webhook from start to finish: resolve the
//! integration's provider, normalize the payload, perform any SNS handshake,
//! persist the canonical events, then submit the projected status updates as
//! one batch. The service holds no mutable state; concurrent calls share it
//! freely and rely on the message-history store for conditional applies.

use std::sync::Arc;

use bytes::Bytes;
use mailhook_core::{IntegrationId, ProviderKind, Result, WorkspaceId};
use mailhook_providers::{Normalized, Normalizers, SnsAction};
use tracing::{debug, error, info, instrument, Span};

use crate::{
    config::Config,
    confirm::{ConfirmationOutcome, HttpSubscriptionConfirmer, SubscriptionConfirmer},
    projector,
    storage::{EventStore, MessageHistoryStore, WorkspaceDirectory},
};

/// What one `process_webhook` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingSummary {
    /// Canonical events handed to the event store.
    pub events_stored: usize,
    /// Status updates handed to the message-history store.
    pub updates_submitted: usize,
    /// Response to the SNS handshake, when one was performed.
    pub confirmation: Option<ConfirmationOutcome>,
}

/// Entry point for inbound provider webhooks.
#[derive(Clone)]
pub struct WebhookEventService {
    directory: Arc<dyn WorkspaceDirectory>,
    event_store: Arc<dyn EventStore>,
    history_store: Arc<dyn MessageHistoryStore>,
    confirmer: Arc<dyn SubscriptionConfirmer>,
    normalizers: Normalizers,
    confirm_subscriptions: bool,
}

impl WebhookEventService {
    /// Creates a service over the given boundaries, using system time and
    /// confirming SNS subscriptions.
    pub fn new(
        directory: Arc<dyn WorkspaceDirectory>,
        event_store: Arc<dyn EventStore>,
        history_store: Arc<dyn MessageHistoryStore>,
        confirmer: Arc<dyn SubscriptionConfirmer>,
    ) -> Self {
        Self {
            directory,
            event_store,
            history_store,
            confirmer,
            normalizers: Normalizers::with_real_clock(),
            confirm_subscriptions: true,
        }
    }

    /// Creates a service with an HTTP confirmer built from `config`.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionConfirmation` if the HTTP client cannot be built.
    pub fn from_config(
        config: &Config,
        directory: Arc<dyn WorkspaceDirectory>,
        event_store: Arc<dyn EventStore>,
        history_store: Arc<dyn MessageHistoryStore>,
    ) -> Result<Self> {
        let confirmer = HttpSubscriptionConfirmer::new(&config.to_confirmer_config())?;
        Ok(Self::new(directory, event_store, history_store, Arc::new(confirmer))
            .with_confirm_subscriptions(config.confirm_subscriptions))
    }

    /// Replaces the normalizer dispatcher, e.g. to inject a test clock.
    #[must_use]
    pub fn with_normalizers(mut self, normalizers: Normalizers) -> Self {
        self.normalizers = normalizers;
        self
    }

    /// Enables or disables the SNS subscription handshake.
    #[must_use]
    pub fn with_confirm_subscriptions(mut self, enabled: bool) -> Self {
        self.confirm_subscriptions = enabled;
        self
    }

    /// Processes one webhook payload.
    ///
    /// Events are stored before status updates are submitted. A payload
    /// yielding no events touches neither store.
    ///
    /// # Errors
    ///
    /// Configuration errors when the workspace, integration or provider is
    /// unknown, payload errors from the normalizer, handshake transport
    /// errors, and store failures. Nothing is retried; the provider's own
    /// re-delivery covers the whole payload.
    #[instrument(
        name = "process_webhook",
        skip(self, payload),
        fields(
            workspace_id = %workspace_id,
            integration_id = %integration_id,
            provider = tracing::field::Empty,
            payload_size = payload.len(),
        )
    )]
    pub async fn process_webhook(
        &self,
        workspace_id: &WorkspaceId,
        integration_id: &IntegrationId,
        payload: Bytes,
    ) -> Result<ProcessingSummary> {
        let provider = self.resolve_provider(workspace_id, integration_id).await?;
        Span::current().record("provider", provider.as_str());

        let Normalized { events, action } =
            self.normalizers.normalize(provider, integration_id, &payload)?;

        let mut summary = ProcessingSummary::default();
        if let Some(action) = action {
            summary.confirmation = self.perform(action).await?;
        }

        if events.is_empty() {
            debug!("No events to record");
            return Ok(summary);
        }

        self.event_store.store_events(workspace_id, &events).await.map_err(|e| {
            error!(error = %e, events = events.len(), "Failed to store webhook events");
            e
        })?;
        summary.events_stored = events.len();

        let updates = projector::project(&events);
        if !updates.is_empty() {
            self.history_store.set_statuses_if_not_set(workspace_id, &updates).await.map_err(
                |e| {
                    error!(error = %e, updates = updates.len(), "Failed to submit status updates");
                    e
                },
            )?;
        }
        summary.updates_submitted = updates.len();

        info!(
            events_stored = summary.events_stored,
            updates_submitted = summary.updates_submitted,
            "Webhook processed"
        );
        Ok(summary)
    }

    /// Normalizes a payload without persisting anything or performing the
    /// SNS handshake.
    ///
    /// # Errors
    ///
    /// Payload errors from the normalizer.
    pub fn normalize_only(
        &self,
        provider: ProviderKind,
        integration_id: &IntegrationId,
        payload: &Bytes,
    ) -> Result<Normalized> {
        self.normalizers.normalize(provider, integration_id, payload)
    }

    async fn resolve_provider(
        &self,
        workspace_id: &WorkspaceId,
        integration_id: &IntegrationId,
    ) -> Result<ProviderKind> {
        let kind = self.directory.integration_provider_kind(workspace_id, integration_id).await?;
        kind.parse()
    }

    async fn perform(&self, action: SnsAction) -> Result<Option<ConfirmationOutcome>> {
        match action {
            SnsAction::ConfirmSubscription { url, topic_arn } => {
                if !self.confirm_subscriptions {
                    info!(topic_arn = ?topic_arn, "SNS subscription confirmation disabled, skipping");
                    return Ok(None);
                }
                let outcome = self.confirmer.confirm(&url).await?;
                Ok(Some(outcome))
            },
        }
    }
}

impl std::fmt::Debug for WebhookEventService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookEventService")
            .field("normalizers", &self.normalizers)
            .field("confirm_subscriptions", &self.confirm_subscriptions)
            .finish_non_exhaustive()
    }
}
