//! OpenAI-compatible [`LlmClient`] backed by async-openai. Defaults to the OpenRouter endpoint.

use std::sync::Arc;

use async_openai::{config::OpenAIConfig, types::CreateChatCompletionRequestArgs, Client};
use async_trait::async_trait;
use dbot_core::{Message, ModelId, TransportError, TransportErrorKind};
use tracing::{debug, info, instrument};

use crate::config::LlmConfig;
use crate::error::classify_error;
use crate::{build_request_messages, mask_token, LlmClient};

/// OpenRouter's OpenAI-compatible API base.
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Chat Completions client. The model is chosen per call; the system prompt is fixed.
#[derive(Clone)]
pub struct OpenAILlmClient {
    client: Arc<Client<OpenAIConfig>>,
    /// Kept only for masked logging.
    api_key_for_logging: String,
    system_prompt: Option<String>,
}

impl OpenAILlmClient {
    /// Client against [`OPENROUTER_BASE_URL`].
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, OPENROUTER_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let api_key_for_logging = api_key.clone();
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url);
        Self {
            client: Arc::new(Client::with_config(config)),
            api_key_for_logging,
            system_prompt: None,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::with_base_url(config.api_key.clone(), config.base_url.clone())
            .with_system_prompt_opt(config.system_prompt.clone())
    }

    pub fn with_system_prompt_opt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }
}

#[async_trait]
impl LlmClient for OpenAILlmClient {
    #[instrument(skip(self, history, user_text), fields(model = %model))]
    async fn complete(
        &self,
        model: &ModelId,
        history: &[Message],
        user_text: &str,
    ) -> Result<String, TransportError> {
        let messages = build_request_messages(self.system_prompt.as_deref(), history, user_text)
            .map_err(|e| classify_error(&e))?;

        info!(
            model = %model,
            message_count = messages.len(),
            api_key = %mask_token(&self.api_key_for_logging),
            "Chat completion request"
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(model.as_str())
            .messages(messages)
            .build()
            .map_err(|e| classify_error(&e))?;

        if let Ok(json) = serde_json::to_string(&request) {
            debug!(request_json = %json, "Chat completion request JSON");
        }

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| classify_error(&e))?;

        if let Some(ref u) = response.usage {
            info!(
                prompt_tokens = u.prompt_tokens,
                completion_tokens = u.completion_tokens,
                total_tokens = u.total_tokens,
                "Chat completion usage"
            );
        }

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                TransportError::new(
                    TransportErrorKind::EmptyResponse,
                    format!("model {} returned no content", model),
                )
            })
    }
}
