use std::net::SocketAddr;
use std::time::Duration;

use teloxide::types::UserId;
use thiserror::Error;
use url::Url;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://users.db";
pub const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_LLM_MODEL: &str = "deepseek/deepseek-r1-0528:free";
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} should be set")]
    Missing(&'static str),
    #[error("{name} can't be parsed: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Where updates come from when the bot runs behind a public URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    pub url: Url,
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub llm_api_key: String,
    pub admin_id: UserId,
    pub database_url: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub generation_timeout: Duration,
    pub support_contact: Option<String>,
    pub webhook: Option<WebhookConfig>,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bot_token = get("TELOXIDE_TOKEN")
            .or_else(|| get("BOT_TOKEN"))
            .ok_or(ConfigError::Missing("TELOXIDE_TOKEN"))?;
        let llm_api_key = get("OPENROUTER_API_KEY").ok_or(ConfigError::Missing("OPENROUTER_API_KEY"))?;
        let admin_id = get("ADMIN_ID")
            .ok_or(ConfigError::Missing("ADMIN_ID"))?
            .trim()
            .parse::<u64>()
            .map(UserId)
            .map_err(|e| invalid("ADMIN_ID", e))?;

        let generation_timeout = match get("GENERATION_TIMEOUT_SECS") {
            Some(secs) => secs
                .trim()
                .parse::<u64>()
                .map_err(|e| invalid("GENERATION_TIMEOUT_SECS", e))?,
            None => DEFAULT_GENERATION_TIMEOUT_SECS,
        };
        if generation_timeout == 0 {
            return Err(invalid("GENERATION_TIMEOUT_SECS", "must be greater than zero"));
        }

        let webhook = match (get("NGROK_URL"), get("NGROK_ADDR")) {
            (Some(url), Some(addr)) => Some(WebhookConfig {
                url: url.parse().map_err(|e| invalid("NGROK_URL", e))?,
                addr: addr.parse().map_err(|e| invalid("NGROK_ADDR", e))?,
            }),
            _ => None,
        };

        Ok(Self {
            bot_token,
            llm_api_key,
            admin_id,
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            llm_base_url: get("LLM_BASE_URL").unwrap_or_else(|| DEFAULT_LLM_BASE_URL.into()),
            llm_model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.into()),
            generation_timeout: Duration::from_secs(generation_timeout),
            support_contact: get("SUPPORT_CONTACT"),
            webhook,
        })
    }
}

fn invalid(name: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.to_string(),
    }
}
