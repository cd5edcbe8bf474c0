//! External endpoint configuration
//!
//! Endpoints come from the config file when present, otherwise from the
//! environment (a `.env` file is loaded by the binary):
//!
//! ```bash
//! export MARKET_API_URL="http://localhost:3001"
//! export WALLET_ID="7xKX..."
//! export OPENAI_API_KEY="sk-..."
//! ```

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::{Error, Result};

/// Environment variable names
mod env_vars {
    pub const MARKET_API_URL: &str = "MARKET_API_URL";
    pub const WALLET_ID: &str = "WALLET_ID";
    pub const LLM_BASE_URL: &str = "LLM_BASE_URL";
    pub const LLM_MODEL: &str = "LLM_MODEL";
}

/// Default variable holding the LLM API key
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_MARKET_API_URL: &str = "http://localhost:3001";
const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Market and wallet data service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataApiConfig {
    pub base_url: String,
    /// Wallet to optimize
    #[serde(default)]
    pub wallet_id: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl DataApiConfig {
    /// Read `MARKET_API_URL` and `WALLET_ID`, falling back to a local service
    pub fn from_env() -> Self {
        let base_url = match std::env::var(env_vars::MARKET_API_URL) {
            Ok(url) => {
                tracing::debug!("Using MARKET_API_URL for market data");
                url
            }
            Err(_) => DEFAULT_MARKET_API_URL.to_string(),
        };

        Self {
            base_url,
            wallet_id: std::env::var(env_vars::WALLET_ID).ok(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            wallet_id: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn with_wallet(mut self, wallet_id: impl Into<String>) -> Self {
        self.wallet_id = Some(wallet_id.into());
        self
    }

    /// Absolute URL for `path` under the base URL
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        join_url(&self.base_url, path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DataApiConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Chat completion endpoint settings. The API key itself never lives in the
/// config; only the name of the variable that holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_llm_base_url() -> String {
    std::env::var(env_vars::LLM_BASE_URL).unwrap_or_else(|_| DEFAULT_LLM_BASE_URL.to_string())
}

fn default_llm_model() -> String {
    std::env::var(env_vars::LLM_MODEL).unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string())
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_temperature() -> f32 {
    0.2
}

fn default_api_key_env() -> String {
    OPENAI_API_KEY_ENV.to_string()
}

fn default_llm_timeout_secs() -> u64 {
    60
}

impl LlmSettings {
    /// Settings from the environment, or `None` when no API key is set
    pub fn from_env() -> Option<Self> {
        let settings = Self::default();
        match std::env::var(&settings.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Some(settings),
            _ => None,
        }
    }

    pub fn api_key(&self) -> Result<SecretString> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(SecretString::from(key)),
            _ => Err(Error::Config(format!(
                "No LLM API key found. Set the {} environment variable.",
                self.api_key_env
            ))),
        }
    }

    pub fn chat_completions_url(&self) -> Result<Url> {
        join_url(&self.base_url, "chat/completions")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn join_url(base: &str, path: &str) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    joined
        .parse()
        .map_err(|e| Error::Config(format!("Invalid URL '{}': {}", joined, e)))
}
