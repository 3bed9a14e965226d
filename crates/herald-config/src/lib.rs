//! Herald Configuration
//!
//! TOML configuration loading and validation

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub core: CoreConfig,
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CoreConfig {
    pub data_dir: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    /// Bot token in `<bot id>:<secret>` form.
    pub bot_token: String,
    /// Destination chat. May contain `{{ field }}` templates resolved
    /// against each event's payload.
    pub chat_id: String,
    /// Oversized-content handling: the value `split` segments long text and
    /// captions into multiple messages, anything else truncates.
    #[serde(default)]
    pub long_message: Option<String>,
    /// Override for the Bot API host, mainly for tests.
    #[serde(default)]
    pub api_base: Option<String>,
    /// Timeout for fetching binary payloads, seconds.
    #[serde(default)]
    pub fetch_timeout_secs: Option<u64>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|dir| dir.join("herald").join("config.toml"))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let token = self.telegram.bot_token.trim();
        if token.is_empty() {
            anyhow::bail!("telegram.bot_token is required");
        }
        let mut parts = token.splitn(2, ':');
        let bot_id = parts.next().unwrap_or_default().trim();
        let secret = parts.next().unwrap_or_default().trim();
        if bot_id.is_empty() || secret.is_empty() {
            anyhow::bail!("telegram.bot_token must have the form '<bot id>:<secret>'");
        }

        if self.telegram.chat_id.trim().is_empty() {
            anyhow::bail!("telegram.chat_id is required");
        }

        if let Some(api_base) = &self.telegram.api_base {
            if api_base.trim().is_empty() {
                anyhow::bail!("telegram.api_base cannot be empty when set");
            }
        }

        if let Some(timeout) = self.telegram.fetch_timeout_secs {
            if timeout == 0 {
                anyhow::bail!("telegram.fetch_timeout_secs must be > 0");
            }
        }

        Ok(())
    }
}
