//! Configuration for the webhook event service.

use std::time::Duration;

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::confirm::ConfirmerConfig;

const CONFIG_FILE: &str = "mailhook.toml";
const ENV_PREFIX: &str = "MAILHOOK_";

/// Service configuration with defaults, file, and environment overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables prefixed with `MAILHOOK_` (highest priority)
/// 2. Configuration file (`mailhook.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// # Example
///
/// ```no_run
/// use mailhook_ingest::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
/// println!("Confirm SNS subscriptions: {}", config.confirm_subscriptions);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Whether SNS subscription handshakes are confirmed. Disable for
    /// replays and dry runs.
    ///
    /// Environment variable: `MAILHOOK_CONFIRM_SUBSCRIPTIONS`
    #[serde(default = "default_confirm_subscriptions")]
    pub confirm_subscriptions: bool,

    /// Timeout for the confirmation GET in seconds. Unset means no timeout
    /// of its own.
    ///
    /// Environment variable: `MAILHOOK_CONFIRMATION_TIMEOUT_SECONDS`
    #[serde(default)]
    pub confirmation_timeout_seconds: Option<u64>,

    /// User agent for the confirmation GET.
    ///
    /// Environment variable: `MAILHOOK_USER_AGENT`
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Log filter directive.
    ///
    /// Environment variable: `MAILHOOK_RUST_LOG`
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

impl Config {
    /// Loads configuration from defaults, `mailhook.toml`, and the
    /// environment.
    pub fn load() -> Result<Self> {
        Self::load_from(Figment::new().merge(Toml::file(CONFIG_FILE)))
    }

    /// Loads configuration from a specific TOML file instead of
    /// `mailhook.toml`. Environment overrides still apply.
    pub fn load_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::load_from(Figment::new().merge(Toml::file(path.as_ref())))
    }

    fn load_from(file: Figment) -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(file)
            .merge(Env::prefixed(ENV_PREFIX));

        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Converts to the confirmer's configuration.
    pub fn to_confirmer_config(&self) -> ConfirmerConfig {
        ConfirmerConfig {
            timeout: self.confirmation_timeout_seconds.map(Duration::from_secs),
            user_agent: self.user_agent.clone(),
        }
    }

    /// Validates configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            anyhow::bail!("user_agent must not be empty");
        }

        if self.confirmation_timeout_seconds == Some(0) {
            anyhow::bail!("confirmation_timeout_seconds must be greater than 0 when set");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            confirm_subscriptions: default_confirm_subscriptions(),
            confirmation_timeout_seconds: None,
            user_agent: default_user_agent(),
            rust_log: default_log_level(),
        }
    }
}

fn default_confirm_subscriptions() -> bool {
    true
}

fn default_user_agent() -> String {
    ConfirmerConfig::default().user_agent
}

fn default_log_level() -> String {
    "info".to_string()
}
