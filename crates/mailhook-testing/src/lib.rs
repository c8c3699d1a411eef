//! Test infrastructure for mailhook.
//!
//! Provides provider payload fixtures, a mock SNS endpoint, and
//! [`TestEnv`], which wires a [`WebhookEventService`] to in-memory stores and
//! a frozen clock.

pub mod fixtures;
pub mod http;

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use mailhook_core::{IntegrationId, ProviderKind, Result, TestClock, WorkspaceId};
use mailhook_ingest::{
    storage::mock::{MockEventStore, MockMessageHistoryStore, MockWorkspaceDirectory},
    HttpSubscriptionConfirmer, ProcessingSummary, RecordingConfirmer, SubscriptionConfirmer,
    WebhookEventService,
};
use mailhook_providers::Normalizers;
use tracing_subscriber::EnvFilter;

/// Workspace every `TestEnv` registers.
pub const TEST_WORKSPACE: &str = "ws-test";

/// Installs a test-writer subscriber once per process.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,mailhook=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Ingestion time the test clock starts at.
pub fn test_start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).single().unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Service wired to in-memory boundaries.
pub struct TestEnv {
    pub service: WebhookEventService,
    pub directory: MockWorkspaceDirectory,
    pub event_store: MockEventStore,
    pub history_store: MockMessageHistoryStore,
    pub confirmer: RecordingConfirmer,
    pub clock: TestClock,
}

impl TestEnv {
    /// Creates an environment whose SNS handshakes are recorded, not sent.
    pub async fn new() -> Self {
        let confirmer = RecordingConfirmer::new();
        Self::build(confirmer.clone(), Arc::new(confirmer)).await
    }

    /// Creates an environment whose confirmer fails every handshake.
    pub async fn with_failing_confirmer(message: &str) -> Self {
        let confirmer = RecordingConfirmer::failing(message);
        Self::build(confirmer.clone(), Arc::new(confirmer)).await
    }

    /// Creates an environment sending real handshake GETs.
    pub async fn with_http_confirmer() -> Self {
        let confirmer = match HttpSubscriptionConfirmer::with_defaults() {
            Ok(confirmer) => confirmer,
            Err(e) => panic!("failed to build HTTP confirmer: {e}"),
        };
        Self::build(RecordingConfirmer::new(), Arc::new(confirmer)).await
    }

    async fn build(
        recording: RecordingConfirmer,
        confirmer: Arc<dyn SubscriptionConfirmer>,
    ) -> Self {
        init_test_tracing();

        let directory = MockWorkspaceDirectory::new();
        directory.add_workspace(Self::workspace()).await;
        let event_store = MockEventStore::new();
        let history_store = MockMessageHistoryStore::new();
        let clock = TestClock::with_start_time(test_start_time());

        let service = WebhookEventService::new(
            Arc::new(directory.clone()),
            Arc::new(event_store.clone()),
            Arc::new(history_store.clone()),
            confirmer,
        )
        .with_normalizers(Normalizers::new(Arc::new(clock.clone())));

        Self { service, directory, event_store, history_store, confirmer: recording, clock }
    }

    /// Disables the SNS handshake on the wired service.
    pub fn without_confirmation(mut self) -> Self {
        self.service = self.service.with_confirm_subscriptions(false);
        self
    }

    /// The workspace registered in the directory.
    pub fn workspace() -> WorkspaceId {
        WorkspaceId::from(TEST_WORKSPACE)
    }

    /// Registers an integration for `provider` and returns its id.
    pub async fn add_integration(&self, provider: ProviderKind) -> IntegrationId {
        let integration_id = IntegrationId::from(format!("{provider}-integration"));
        self.directory
            .add_integration(Self::workspace(), integration_id.clone(), provider)
            .await;
        integration_id
    }

    /// Processes a fixture on an integration of the test workspace.
    pub async fn process(
        &self,
        integration_id: &IntegrationId,
        payload: &serde_json::Value,
    ) -> Result<ProcessingSummary> {
        self.process_bytes(integration_id, fixtures::to_bytes(payload)).await
    }

    /// Processes raw bytes on an integration of the test workspace.
    pub async fn process_bytes(
        &self,
        integration_id: &IntegrationId,
        payload: Bytes,
    ) -> Result<ProcessingSummary> {
        self.service.process_webhook(&Self::workspace(), integration_id, payload).await
    }
}
