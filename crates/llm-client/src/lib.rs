//! # LLM client abstraction
//!
//! Defines the [`LlmClient`] trait (the transport the response service delegates a turn to) and
//! an OpenAI-compatible implementation. The default endpoint is OpenRouter.
//!
//! The client does no retries of its own beyond what async-openai does for HTTP 429/5xx; the
//! caller bounds the whole call with a timeout.

use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
};
use async_trait::async_trait;
use dbot_core::{Message, ModelId, Role, TransportError};

mod config;
mod error;
mod openai_llm;

pub use config::LlmConfig;
pub use error::{classify_error, classify_message};
pub use openai_llm::{OpenAILlmClient, OPENROUTER_BASE_URL};

/// Transport to an LLM provider: one request per turn, opaque request/response.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Returns the model's reply to `user_text`, given the prior `history` (oldest first).
    async fn complete(
        &self,
        model: &ModelId,
        history: &[Message],
        user_text: &str,
    ) -> Result<String, TransportError>;
}

/// Masks an API key for safe logging: first 7 chars + `***` + last 4 chars.
/// Keys of length ≤ 11 are fully masked as `***`.
pub fn mask_token(token: &str) -> String {
    let len = token.len();
    if len <= 11 || !token.is_char_boundary(7) || !token.is_char_boundary(len - 4) {
        return "***".to_string();
    }
    format!("{}***{}", &token[..7], &token[len - 4..])
}

/// Builds the Chat Completions `messages` array: optional system prompt, the history in order,
/// then the new user text.
pub fn build_request_messages(
    system_prompt: Option<&str>,
    history: &[Message],
    user_text: &str,
) -> Result<Vec<ChatCompletionRequestMessage>, async_openai::error::OpenAIError> {
    let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(history.len() + 2);
    if let Some(system) = system_prompt {
        messages.push(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system.to_string())
                .build()?
                .into(),
        );
    }
    for message in history {
        messages.push(history_message_to_openai(message)?);
    }
    messages.push(
        ChatCompletionRequestUserMessageArgs::default()
            .content(user_text.to_string())
            .build()?
            .into(),
    );
    Ok(messages)
}

fn history_message_to_openai(
    message: &Message,
) -> Result<ChatCompletionRequestMessage, async_openai::error::OpenAIError> {
    let content = message.content.clone();
    let openai_msg: ChatCompletionRequestMessage = match message.role {
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()?
            .into(),
    };
    Ok(openai_msg)
}
