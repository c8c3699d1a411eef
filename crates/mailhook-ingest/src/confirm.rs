//! SNS subscription confirmation.
//!
//! SNS will not deliver notifications to an endpoint until the endpoint
//! fetches the `SubscribeURL` from the handshake message. The fetch is a
//! plain GET with no retry; a transport failure fails the webhook call and
//! SNS re-sends the handshake.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use mailhook_core::{MailhookError, Result};
use tokio::sync::Mutex;
use tracing::{info_span, Instrument};

/// Settings for the confirmation client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmerConfig {
    /// Request timeout. `None` leaves the GET bounded only by the caller.
    pub timeout: Option<Duration>,
    /// User agent sent with the GET.
    pub user_agent: String,
}

impl Default for ConfirmerConfig {
    fn default() -> Self {
        Self { timeout: None, user_agent: "Mailhook-SNS-Confirmer/1.0".to_string() }
    }
}

/// Response to a confirmation GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationOutcome {
    /// HTTP status returned by SNS.
    pub status: u16,
}

impl ConfirmationOutcome {
    /// Whether SNS accepted the confirmation.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs the SNS subscription handshake.
#[async_trait]
pub trait SubscriptionConfirmer: Send + Sync + 'static {
    /// Fetches `url` to confirm the subscription.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionConfirmation` on transport failure. Any HTTP
    /// status, success or not, is an `Ok` outcome.
    async fn confirm(&self, url: &str) -> Result<ConfirmationOutcome>;
}

/// Confirmer issuing the GET with reqwest.
#[derive(Debug, Clone)]
pub struct HttpSubscriptionConfirmer {
    client: reqwest::Client,
}

impl HttpSubscriptionConfirmer {
    /// Builds a confirmer from `config`.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionConfirmation` if the HTTP client cannot be built.
    pub fn new(config: &ConfirmerConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            MailhookError::confirmation(format!("failed to build HTTP client: {e}"))
        })?;

        Ok(Self { client })
    }

    /// Builds a confirmer with default settings.
    pub fn with_defaults() -> Result<Self> {
        Self::new(&ConfirmerConfig::default())
    }
}

#[async_trait]
impl SubscriptionConfirmer for HttpSubscriptionConfirmer {
    async fn confirm(&self, url: &str) -> Result<ConfirmationOutcome> {
        let span = info_span!("sns_subscription_confirm", url = %redact_query(url));

        async move {
            tracing::debug!("Confirming SNS subscription");

            let response = self.client.get(url).send().await.map_err(|e| {
                tracing::warn!(error = %e, "SNS subscription confirmation request failed");
                MailhookError::confirmation(e.to_string())
            })?;

            let outcome = ConfirmationOutcome { status: response.status().as_u16() };
            if outcome.is_success() {
                tracing::info!(status = outcome.status, "SNS subscription confirmed");
            } else {
                tracing::warn!(status = outcome.status, "SNS subscription confirmation rejected");
            }
            Ok(outcome)
        }
        .instrument(span)
        .await
    }
}

/// Confirmer that records URLs instead of fetching them.
#[derive(Debug, Clone)]
pub struct RecordingConfirmer {
    urls: Arc<Mutex<Vec<String>>>,
    status: u16,
    fail_with: Option<String>,
}

impl RecordingConfirmer {
    /// Creates a confirmer answering every call with 200.
    pub fn new() -> Self {
        Self::with_status(200)
    }

    /// Creates a confirmer answering every call with `status`.
    pub fn with_status(status: u16) -> Self {
        Self { urls: Arc::new(Mutex::new(Vec::new())), status, fail_with: None }
    }

    /// Creates a confirmer whose calls fail in transport.
    pub fn failing(message: impl Into<String>) -> Self {
        Self { fail_with: Some(message.into()), ..Self::new() }
    }

    /// URLs confirmed so far, in call order.
    pub async fn confirmed_urls(&self) -> Vec<String> {
        self.urls.lock().await.clone()
    }
}

impl Default for RecordingConfirmer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionConfirmer for RecordingConfirmer {
    async fn confirm(&self, url: &str) -> Result<ConfirmationOutcome> {
        self.urls.lock().await.push(url.to_string());
        match &self.fail_with {
            Some(message) => Err(MailhookError::confirmation(message.clone())),
            None => Ok(ConfirmationOutcome { status: self.status }),
        }
    }
}

/// Strips the query string, which carries the subscription token.
fn redact_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}
