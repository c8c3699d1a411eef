//! Mailhook webhook replay tool.
//!
//! Re-normalizes a stored raw webhook payload offline and prints the
//! canonical events and projected status updates as JSON. Nothing is
//! persisted and no SNS handshake is performed; a requested handshake is
//! reported instead.
//!
//! ```text
//! mailhook-replay <provider> <payload-file | -> [integration-id]
//! ```

use std::{env, path::PathBuf};

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use mailhook_core::{CanonicalWebhookEvent, IntegrationId, MessageEventUpdate, ProviderKind};
use mailhook_ingest::{project, telemetry, Config};
use mailhook_providers::{Normalizers, SnsAction};
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

const USAGE: &str = "usage: mailhook-replay <provider> <payload-file | -> [integration-id]";
const DEFAULT_INTEGRATION: &str = "replay";

#[derive(Debug)]
struct Args {
    provider: ProviderKind,
    source: PayloadSource,
    integration_id: IntegrationId,
}

#[derive(Debug)]
enum PayloadSource {
    Stdin,
    File(PathBuf),
}

#[derive(Debug, Serialize)]
struct ReplayReport<'a> {
    provider: ProviderKind,
    events: &'a [CanonicalWebhookEvent],
    updates: Vec<MessageEventUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subscription_confirmation_url: Option<&'a str>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    telemetry::init_tracing(&config.rust_log)?;

    let args = parse_args(env::args().skip(1))?;
    debug!(provider = %args.provider, source = ?args.source, "Replaying payload");

    let payload = read_payload(&args.source).await?;
    let normalized = Normalizers::with_real_clock()
        .normalize(args.provider, &args.integration_id, &payload)
        .context("Payload failed to normalize")?;

    let subscription_confirmation_url = match &normalized.action {
        Some(SnsAction::ConfirmSubscription { url, .. }) => {
            info!("Payload requests an SNS subscription confirmation; not performing it");
            Some(url.as_str())
        },
        None => None,
    };

    let report = ReplayReport {
        provider: args.provider,
        events: &normalized.events,
        updates: project(&normalized.events),
        subscription_confirmation_url,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let (Some(provider), Some(source)) = (args.next(), args.next()) else {
        bail!(USAGE);
    };
    let integration_id = IntegrationId::from(args.next().unwrap_or_else(|| DEFAULT_INTEGRATION.into()));
    if args.next().is_some() {
        bail!(USAGE);
    }

    let provider: ProviderKind = provider.parse()?;
    let source = if source == "-" { PayloadSource::Stdin } else { PayloadSource::File(source.into()) };

    Ok(Args { provider, source, integration_id })
}

async fn read_payload(source: &PayloadSource) -> Result<Bytes> {
    let bytes = match source {
        PayloadSource::Stdin => {
            let mut buffer = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buffer)
                .await
                .context("Failed to read payload from stdin")?;
            buffer
        },
        PayloadSource::File(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read payload from {}", path.display()))?,
    };
    Ok(Bytes::from(bytes))
}
