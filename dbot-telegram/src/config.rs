//! Bot configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use conversation_store::HistoryLimit;
use dbot_core::{DbotError, ModelId, Result};
use llm_client::LlmConfig;

/// Free OpenRouter models used when `LLM_MODELS` is unset, in fallback order.
pub const FREE_MODELS: &[&str] = &[
    "meta-llama/llama-3.2-3b-instruct:free",
    "mistralai/mistral-7b-instruct:free",
    "deepseek/deepseek-chat:free",
    "google/gemma-2-2b-it:free",
    "qwen/qwen-2-7b-instruct:free",
    "microsoft/phi-3-mini-128k-instruct:free",
];

pub const DEFAULT_THINKING_MESSAGE: &str = "Thinking...";
pub const DEFAULT_SQLITE_PATH: &str = "./data/history.db";

/// Which conversation store backend to use (`HISTORY_STORE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStoreKind {
    Memory,
    Sqlite,
}

impl HistoryStoreKind {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "" | "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(DbotError::Config(format!(
                "HISTORY_STORE must be 'memory' or 'sqlite', got '{}'",
                other
            ))),
        }
    }
}

/// Model registry settings: `LLM_MODELS` and `DEFAULT_MODEL`.
///
/// Loadable on its own so the registry can be inspected without a bot token.
#[derive(Debug, Clone)]
pub struct ModelRegistryConfig {
    pub models: Vec<ModelId>,
    pub default_model: Option<ModelId>,
}

impl ModelRegistryConfig {
    pub fn from_env() -> Self {
        let models = match env::var("LLM_MODELS") {
            Ok(raw) if !raw.trim().is_empty() => parse_model_list(&raw),
            _ => FREE_MODELS.iter().map(|m| ModelId::from(*m)).collect(),
        };
        let default_model = env::var("DEFAULT_MODEL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(ModelId::from);
        Self {
            models,
            default_model,
        }
    }
}

/// Splits a comma-separated model list, dropping blank entries.
pub fn parse_model_list(raw: &str) -> Vec<ModelId> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ModelId::from)
        .collect()
}

fn env_flag(key: &str, default: bool) -> Result<bool> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(DbotError::Config(format!(
                "{} must be a boolean, got '{}'",
                key, other
            ))),
        },
        Err(_) => Ok(default),
    }
}

/// Full bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    /// Bot API base URL override (`TELEGRAM_API_URL` or `TELOXIDE_API_URL`), e.g. a mock server.
    pub telegram_api_url: Option<String>,
    pub log_file: Option<String>,
    pub llm: LlmConfig,
    pub registry: ModelRegistryConfig,
    pub fallback_on_rate_limit: bool,
    pub history_store: HistoryStoreKind,
    pub history_sqlite_path: PathBuf,
    pub history_limit: HistoryLimit,
    pub thinking_message: String,
}

impl BotConfig {
    /// Loads configuration from the environment. `token` overrides `BOT_TOKEN`.
    ///
    /// Missing `BOT_TOKEN` / API key or malformed values yield [`DbotError::Config`].
    pub fn load(token: Option<String>) -> Result<Self> {
        let bot_token = match token {
            Some(token) => token,
            None => env::var("BOT_TOKEN")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| DbotError::Config("BOT_TOKEN not set".to_string()))?,
        };
        let telegram_api_url = env::var("TELEGRAM_API_URL")
            .or_else(|_| env::var("TELOXIDE_API_URL"))
            .ok();
        let log_file = env::var("LOG_FILE").ok().filter(|s| !s.trim().is_empty());

        let llm = LlmConfig::from_env()?;
        let registry = ModelRegistryConfig::from_env();
        let fallback_on_rate_limit = env_flag("LLM_FALLBACK_ON_RATE_LIMIT", true)?;

        let history_store =
            HistoryStoreKind::parse(&env::var("HISTORY_STORE").unwrap_or_default())?;
        let history_sqlite_path = PathBuf::from(
            env::var("HISTORY_SQLITE_PATH").unwrap_or_else(|_| DEFAULT_SQLITE_PATH.to_string()),
        );
        let history_limit = match env::var("HISTORY_MAX_MESSAGES") {
            Ok(raw) => {
                let max = raw.trim().parse::<usize>().map_err(|_| {
                    DbotError::Config(format!("HISTORY_MAX_MESSAGES is not a number: {}", raw))
                })?;
                HistoryLimit::from_max_messages(max)
            }
            Err(_) => HistoryLimit::MaxMessages(HistoryLimit::DEFAULT_MAX_MESSAGES),
        };
        let thinking_message = env::var("THINKING_MESSAGE")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_THINKING_MESSAGE.to_string());

        Ok(Self {
            bot_token,
            telegram_api_url,
            log_file,
            llm,
            registry,
            fallback_on_rate_limit,
            history_store,
            history_sqlite_path,
            history_limit,
            thinking_message,
        })
    }

    pub fn llm_timeout(&self) -> Duration {
        self.llm.timeout
    }
}
