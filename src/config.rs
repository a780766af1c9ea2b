//! Provider configuration and the process-wide configured client.

use std::{env, fmt, sync::Arc};

use anyhow::{Context, Error, bail};
use base64::prelude::*;
use lazy_static::lazy_static;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::{
    error::{ProviderError, Result},
    sdk::{client::Client, snowflake::SnowflakeExecutor},
};

/// Connection settings, read from the host's provider block with the `SF_*`
/// environment variables as fallback.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub account: String,
    pub user: String,
    pub role: String,
    pub warehouse: String,
    /// PEM-encoded private key for key-pair authentication.
    pub private_key: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("role", &self.role)
            .field("warehouse", &self.warehouse)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

fn setting(config: &Value, key: &str, env_var: &str) -> Option<String> {
    config
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| env::var(env_var).ok().filter(|s| !s.is_empty()))
}

fn required(config: &Value, key: &str, env_var: &str) -> anyhow::Result<String> {
    setting(config, key, env_var).with_context(|| format!("{key} is not configured and {env_var} is not set"))
}

/// Exactly one of the base64 and path forms must be given.
fn resolve_private_key(base64: Option<String>, path: Option<String>) -> anyhow::Result<String> {
    match (base64, path) {
        (Some(_), Some(_)) => Err(Error::msg(
            "Ambiguous: only one of SF_PRIVATE_KEY_BASE64 and SF_PRIVATE_KEY_PATH can be set",
        )),
        (Some(encoded), None) => {
            let decoded = BASE64_STANDARD
                .decode(encoded.trim())
                .context("Failed to decode SF_PRIVATE_KEY_BASE64")?;
            String::from_utf8(decoded).context("SF_PRIVATE_KEY_BASE64 is not valid UTF-8")
        }
        (None, Some(path)) => {
            std::fs::read_to_string(&path).with_context(|| format!("Failed to read private key from {path}"))
        }
        (None, None) => Err(Error::msg("SF_PRIVATE_KEY_BASE64 or SF_PRIVATE_KEY_PATH not set")),
    }
}

impl ProviderConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        ProviderConfig::from_value(&Value::Null)
    }

    /// Keys: `account`, `user`, `role`, `warehouse`, and one of `private_key`,
    /// `private_key_base64`, `private_key_path`.
    pub fn from_value(config: &Value) -> anyhow::Result<Self> {
        if !config.is_null() && !config.is_object() {
            bail!("provider configuration must be an object");
        }

        let private_key = match config.get("private_key").and_then(Value::as_str) {
            Some(pem) if !pem.is_empty() => pem.to_string(),
            _ => resolve_private_key(
                setting(config, "private_key_base64", "SF_PRIVATE_KEY_BASE64"),
                setting(config, "private_key_path", "SF_PRIVATE_KEY_PATH"),
            )?,
        };

        Ok(ProviderConfig {
            account: required(config, "account", "SF_ACCOUNT")?,
            user: required(config, "user", "SF_USER")?,
            role: required(config, "role", "SF_ROLE")?,
            warehouse: required(config, "warehouse", "SF_WAREHOUSE")?,
            private_key,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    Ready,
    Failed,
}

/// A client configured at most once. Whatever the first configuration
/// produced, success or failure, every later caller sees the same outcome.
#[derive(Debug, Default)]
pub struct ClientCache {
    cell: OnceCell<std::result::Result<Client, String>>,
}

impl ClientCache {
    pub fn new() -> Self {
        ClientCache { cell: OnceCell::new() }
    }

    pub fn state(&self) -> ClientState {
        match self.cell.get() {
            None => ClientState::Uninitialized,
            Some(Ok(_)) => ClientState::Ready,
            Some(Err(_)) => ClientState::Failed,
        }
    }

    pub async fn get_or_configure<F>(&self, configure: F) -> Result<Client>
    where
        F: FnOnce() -> anyhow::Result<Client>,
    {
        let outcome = self
            .cell
            .get_or_init(|| async {
                configure().map_err(|e| {
                    tracing::warn!("failed to configure Snowflake client: {e:#}");
                    format!("{e:#}")
                })
            })
            .await;
        outcome.clone().map_err(ProviderError::Configuration)
    }
}

lazy_static! {
    static ref CONFIGURED_CLIENT: ClientCache = ClientCache::new();
}

/// The process-wide client. The first call decides the configuration.
pub async fn configured_client(config: &Value) -> Result<Client> {
    CONFIGURED_CLIENT
        .get_or_configure(|| {
            let config = ProviderConfig::from_value(config)?;
            tracing::info!("configuring Snowflake client for account {}", config.account);
            let executor = SnowflakeExecutor::connect(&config)?;
            Ok(Client::new(Arc::new(executor)))
        })
        .await
}

pub fn configured_client_state() -> ClientState {
    CONFIGURED_CLIENT.state()
}
