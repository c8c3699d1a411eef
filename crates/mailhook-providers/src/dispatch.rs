//! Provider dispatch.
//!
//! Routes a raw payload to the normalizer for its provider. The match over
//! [`ProviderKind`] is exhaustive, so a new provider variant does not compile
//! until it has a normalizer here.

use std::sync::Arc;

use bytes::Bytes;
use mailhook_core::{Clock, IntegrationId, ProviderKind, RealClock, Result};
use tracing::{debug, instrument};

use crate::{
    context::{NormalizeContext, Normalized},
    mailgun, mailjet, postmark, ses, smtp, sparkpost,
};

/// Dispatcher over the six provider normalizers.
///
/// Holds no mutable state; one instance serves concurrent calls.
#[derive(Debug, Clone)]
pub struct Normalizers {
    clock: Arc<dyn Clock>,
}

impl Normalizers {
    /// Creates a dispatcher reading ingestion time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Creates a dispatcher using system time.
    pub fn with_real_clock() -> Self {
        Self::new(Arc::new(RealClock::new()))
    }

    /// Normalizes `payload` with the normalizer for `provider`.
    ///
    /// # Errors
    ///
    /// Propagates the normalizer's payload errors. SES never fails on an
    /// unrecognized notification body.
    #[instrument(name = "normalize", skip(self, payload), fields(provider = %provider, integration_id = %integration_id, payload_size = payload.len()))]
    pub fn normalize(
        &self,
        provider: ProviderKind,
        integration_id: &IntegrationId,
        payload: &Bytes,
    ) -> Result<Normalized> {
        let ctx = NormalizeContext::new(provider, integration_id, payload, self.clock.now());

        let normalized = match provider {
            ProviderKind::Ses => ses::normalize(&ctx)?,
            ProviderKind::Postmark => Normalized::events(postmark::normalize(&ctx)?),
            ProviderKind::Mailgun => Normalized::events(mailgun::normalize(&ctx)?),
            ProviderKind::SparkPost => Normalized::events(sparkpost::normalize(&ctx)?),
            ProviderKind::Mailjet => Normalized::events(mailjet::normalize(&ctx)?),
            ProviderKind::Smtp => Normalized::events(smtp::normalize(&ctx)?),
        };

        debug!(
            events = normalized.events.len(),
            has_action = normalized.action.is_some(),
            "Payload normalized"
        );
        Ok(normalized)
    }
}

impl Default for Normalizers {
    fn default() -> Self {
        Self::with_real_clock()
    }
}
