//! LLM transport configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use dbot_core::{DbotError, Result};

use crate::openai_llm::OPENROUTER_BASE_URL;

/// Transport timeout used when `LLM_TIMEOUT_SECS` is unset.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection settings for an OpenAI-compatible chat endpoint.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub system_prompt: Option<String>,
    pub timeout: Duration,
}

impl LlmConfig {
    /// Loads from `OPENROUTER_API_KEY` (or `OPENAI_API_KEY`), `OPENAI_BASE_URL`,
    /// `LLM_SYSTEM_PROMPT` and `LLM_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("OPENROUTER_API_KEY")
            .or_else(|_| env::var("OPENAI_API_KEY"))
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                DbotError::Config("OPENROUTER_API_KEY (or OPENAI_API_KEY) not set".to_string())
            })?;
        let base_url =
            env::var("OPENAI_BASE_URL").unwrap_or_else(|_| OPENROUTER_BASE_URL.to_string());
        let system_prompt = env::var("LLM_SYSTEM_PROMPT")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let timeout_secs = match env::var("LLM_TIMEOUT_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                DbotError::Config(format!("LLM_TIMEOUT_SECS is not a number: {}", raw))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_key,
            base_url,
            system_prompt,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
