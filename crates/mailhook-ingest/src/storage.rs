//! Storage boundaries of the webhook event service.
//!
//! The workspace directory, the event store and the message-history store
//! are owned by other subsystems. The service only sees these traits, so
//! tests can drive it against the in-memory implementations in [`mock`].

use async_trait::async_trait;
use mailhook_core::{
    CanonicalWebhookEvent, IntegrationId, MessageEventUpdate, Result, WorkspaceId,
};

/// Read-only lookup of integration configuration.
#[async_trait]
pub trait WorkspaceDirectory: Send + Sync + 'static {
    /// Returns the provider kind configured on an integration, as stored.
    ///
    /// The service parses the returned name; an unknown name is an
    /// unsupported-provider error.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceNotFound` or `IntegrationNotFound` when either is
    /// unknown.
    async fn integration_provider_kind(
        &self,
        workspace_id: &WorkspaceId,
        integration_id: &IntegrationId,
    ) -> Result<String>;
}

/// Append-only store of canonical events.
#[async_trait]
pub trait EventStore: Send + Sync + 'static {
    /// Persists a batch of canonical events. No deduplication is expected.
    async fn store_events(
        &self,
        workspace_id: &WorkspaceId,
        events: &[CanonicalWebhookEvent],
    ) -> Result<()>;
}

/// Per-message delivery-history store.
#[async_trait]
pub trait MessageHistoryStore: Send + Sync + 'static {
    /// Applies each update independently, skipping any message whose status
    /// for that event is already set.
    ///
    /// Implementations must make each conditional apply atomic; concurrent
    /// or out-of-order notifications must never overwrite a recorded status.
    async fn set_statuses_if_not_set(
        &self,
        workspace_id: &WorkspaceId,
        updates: &[MessageEventUpdate],
    ) -> Result<()>;
}

pub mod mock {
    //! In-memory storage for testing the service without real backends.
    //!
    //! Every store counts its calls and accepts one injected error, which
    //! is returned by the next call and then cleared.

    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    use async_trait::async_trait;
    use mailhook_core::{MailhookError, MessageEvent, ProviderKind};
    use tokio::sync::RwLock;

    use super::{
        CanonicalWebhookEvent, EventStore, IntegrationId, MessageEventUpdate, MessageHistoryStore,
        Result, WorkspaceDirectory, WorkspaceId,
    };

    async fn take_injected(slot: &RwLock<Option<String>>) -> Result<()> {
        match slot.write().await.take() {
            Some(message) => Err(MailhookError::storage(message)),
            None => Ok(()),
        }
    }

    /// Workspace directory backed by a map.
    #[derive(Debug, Clone, Default)]
    pub struct MockWorkspaceDirectory {
        integrations: Arc<RwLock<HashMap<WorkspaceId, HashMap<IntegrationId, String>>>>,
        lookups: Arc<AtomicUsize>,
    }

    impl MockWorkspaceDirectory {
        /// Creates an empty directory.
        pub fn new() -> Self {
            Self::default()
        }

        /// Registers an integration with a known provider.
        pub async fn add_integration(
            &self,
            workspace_id: WorkspaceId,
            integration_id: IntegrationId,
            provider: ProviderKind,
        ) {
            self.add_raw_integration(workspace_id, integration_id, provider.as_str()).await;
        }

        /// Registers an integration with an arbitrary provider name.
        pub async fn add_raw_integration(
            &self,
            workspace_id: WorkspaceId,
            integration_id: IntegrationId,
            provider_kind: &str,
        ) {
            self.integrations
                .write()
                .await
                .entry(workspace_id)
                .or_default()
                .insert(integration_id, provider_kind.to_string());
        }

        /// Registers a workspace with no integrations.
        pub async fn add_workspace(&self, workspace_id: WorkspaceId) {
            self.integrations.write().await.entry(workspace_id).or_default();
        }

        /// Number of lookups served so far.
        pub fn lookup_count(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WorkspaceDirectory for MockWorkspaceDirectory {
        async fn integration_provider_kind(
            &self,
            workspace_id: &WorkspaceId,
            integration_id: &IntegrationId,
        ) -> Result<String> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            let integrations = self.integrations.read().await;
            let workspace = integrations.get(workspace_id).ok_or_else(|| {
                MailhookError::WorkspaceNotFound { workspace_id: workspace_id.clone() }
            })?;
            workspace.get(integration_id).cloned().ok_or_else(|| {
                MailhookError::IntegrationNotFound {
                    workspace_id: workspace_id.clone(),
                    integration_id: integration_id.clone(),
                }
            })
        }
    }

    /// Event store keeping every batch in memory.
    #[derive(Debug, Clone, Default)]
    pub struct MockEventStore {
        events: Arc<RwLock<HashMap<WorkspaceId, Vec<CanonicalWebhookEvent>>>>,
        calls: Arc<AtomicUsize>,
        error: Arc<RwLock<Option<String>>>,
    }

    impl MockEventStore {
        /// Creates an empty store.
        pub fn new() -> Self {
            Self::default()
        }

        /// Fails the next `store_events` call with a storage error.
        pub async fn inject_error(&self, message: impl Into<String>) {
            *self.error.write().await = Some(message.into());
        }

        /// Events stored for a workspace, in arrival order.
        pub async fn stored_events(&self, workspace_id: &WorkspaceId) -> Vec<CanonicalWebhookEvent> {
            self.events.read().await.get(workspace_id).cloned().unwrap_or_default()
        }

        /// Number of `store_events` calls, failed ones included.
        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EventStore for MockEventStore {
        async fn store_events(
            &self,
            workspace_id: &WorkspaceId,
            events: &[CanonicalWebhookEvent],
        ) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            take_injected(&self.error).await?;
            self.events
                .write()
                .await
                .entry(workspace_id.clone())
                .or_default()
                .extend_from_slice(events);
            Ok(())
        }
    }

    /// Message-history store applying set-if-not-set per message and event.
    #[derive(Debug, Clone, Default)]
    pub struct MockMessageHistoryStore {
        statuses: Arc<RwLock<HashMap<(WorkspaceId, String, MessageEvent), MessageEventUpdate>>>,
        batches: Arc<RwLock<Vec<Vec<MessageEventUpdate>>>>,
        calls: Arc<AtomicUsize>,
        error: Arc<RwLock<Option<String>>>,
    }

    impl MockMessageHistoryStore {
        /// Creates an empty store.
        pub fn new() -> Self {
            Self::default()
        }

        /// Fails the next `set_statuses_if_not_set` call with a storage error.
        pub async fn inject_error(&self, message: impl Into<String>) {
            *self.error.write().await = Some(message.into());
        }

        /// The update recorded for a message and event, if any.
        pub async fn status(
            &self,
            workspace_id: &WorkspaceId,
            message_id: &str,
            event: MessageEvent,
        ) -> Option<MessageEventUpdate> {
            let key = (workspace_id.clone(), message_id.to_string(), event);
            self.statuses.read().await.get(&key).cloned()
        }

        /// Number of recorded statuses across all messages.
        pub async fn status_count(&self) -> usize {
            self.statuses.read().await.len()
        }

        /// Every submitted batch, as submitted.
        pub async fn submitted_batches(&self) -> Vec<Vec<MessageEventUpdate>> {
            self.batches.read().await.clone()
        }

        /// Number of `set_statuses_if_not_set` calls, failed ones included.
        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MessageHistoryStore for MockMessageHistoryStore {
        async fn set_statuses_if_not_set(
            &self,
            workspace_id: &WorkspaceId,
            updates: &[MessageEventUpdate],
        ) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            take_injected(&self.error).await?;
            self.batches.write().await.push(updates.to_vec());

            let mut statuses = self.statuses.write().await;
            for update in updates {
                let key = (workspace_id.clone(), update.message_id.clone(), update.event);
                statuses.entry(key).or_insert_with(|| update.clone());
            }
            Ok(())
        }
    }

}
