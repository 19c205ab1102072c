//! # Conversation Storage
//!
//! The `ConversationStore` trait is the only way to read or write conversation history.
//! Backends (in-memory, SQLite) satisfy the same contract and are chosen at startup.

use async_trait::async_trait;
use dbot_core::{ConversationId, Message, Result};

/// Ordered, per-conversation message history.
///
/// Histories of different ids are isolated. A `read` reflects every append that completed
/// before it was issued and never observes a partially written message.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Appends `message` to the end of the conversation, creating the history if absent.
    async fn append(&self, conversation_id: &ConversationId, message: Message) -> Result<()>;

    /// Appends one user/assistant exchange. Readers see either neither message or both.
    ///
    /// The default appends sequentially; backends that can do it atomically override it.
    async fn append_turn(
        &self,
        conversation_id: &ConversationId,
        user: Message,
        assistant: Message,
    ) -> Result<()> {
        self.append(conversation_id, user).await?;
        self.append(conversation_id, assistant).await
    }

    /// Returns the full history, oldest first. Unknown ids yield an empty vec.
    async fn read(&self, conversation_id: &ConversationId) -> Result<Vec<Message>>;

    /// Removes all history of the conversation. Clearing an unknown id succeeds.
    async fn clear(&self, conversation_id: &ConversationId) -> Result<()>;

    /// Whether the conversation has any stored history.
    async fn contains(&self, conversation_id: &ConversationId) -> Result<bool>;
}
