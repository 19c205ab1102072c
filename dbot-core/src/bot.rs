//! Bot abstraction for sending replies.
//!
//! [`Bot`] is transport-agnostic; `dbot_telegram::TelegramBotAdapter` implements it via teloxide
//! and tests substitute a recording mock.

use crate::error::Result;
use crate::types::Chat;
use async_trait::async_trait;

/// Abstraction for sending, deleting and signalling activity in a chat.
#[async_trait]
pub trait Bot: Send + Sync {
    /// Sends a text message to the given chat.
    async fn send_message(&self, chat: &Chat, text: &str) -> Result<()>;
    /// Sends a message and returns its transport-specific id (for a later `delete_message`).
    async fn send_message_and_return_id(&self, chat: &Chat, text: &str) -> Result<String>;
    /// Deletes an already-sent message (the "thinking" placeholder).
    async fn delete_message(&self, chat: &Chat, message_id: &str) -> Result<()>;
    /// Shows the "typing..." indicator in the chat.
    async fn send_typing(&self, chat: &Chat) -> Result<()>;
}
