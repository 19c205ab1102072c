//! # In-Memory Conversation Store
//!
//! Default [`ConversationStore`] backend: a map from conversation id to a bounded queue of
//! messages. Data is lost on restart.
//!
//! ## Example
//!
//! ```rust
//! use conversation_store::{ConversationStore, HistoryLimit, InMemoryConversationStore};
//! use dbot_core::{ConversationId, Message};
//!
//! #[tokio::main]
//! async fn main() -> dbot_core::Result<()> {
//!     let store = InMemoryConversationStore::with_limit(HistoryLimit::from_max_messages(50));
//!     let id = ConversationId::from(42);
//!
//!     store.append(&id, Message::user("hello")).await?;
//!     assert_eq!(store.read(&id).await?.len(), 1);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Thread Safety
//!
//! The map sits behind `Arc<RwLock<>>`; the lock is held only for the copy or push itself, and
//! a turn's two messages are pushed under one write guard.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use dbot_core::{ConversationId, Message, Result};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::limit::HistoryLimit;
use crate::store::ConversationStore;

#[derive(Debug, Clone, Default)]
pub struct InMemoryConversationStore {
    conversations: Arc<RwLock<HashMap<ConversationId, VecDeque<Message>>>>,
    limit: HistoryLimit,
}

impl InMemoryConversationStore {
    /// Creates an empty, unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that keeps at most `limit` messages per conversation.
    pub fn with_limit(limit: HistoryLimit) -> Self {
        Self {
            conversations: Arc::new(RwLock::new(HashMap::new())),
            limit,
        }
    }

    pub fn limit(&self) -> HistoryLimit {
        self.limit
    }

    /// Number of conversations currently holding history.
    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn push_bounded(&self, history: &mut VecDeque<Message>, message: Message) -> usize {
        history.push_back(message);
        let excess = self.limit.excess(history.len());
        history.drain(..excess);
        excess
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append(&self, conversation_id: &ConversationId, message: Message) -> Result<()> {
        let role = message.role;
        let mut conversations = self.conversations.write().await;
        let history = conversations.entry(conversation_id.clone()).or_default();
        let evicted = self.push_bounded(history, message);
        let len = history.len();
        drop(conversations);

        debug!(
            conversation_id = %conversation_id,
            role = %role,
            len,
            evicted,
            "Message appended to in-memory history"
        );
        Ok(())
    }

    async fn append_turn(
        &self,
        conversation_id: &ConversationId,
        user: Message,
        assistant: Message,
    ) -> Result<()> {
        let mut conversations = self.conversations.write().await;
        let history = conversations.entry(conversation_id.clone()).or_default();
        let evicted = self.push_bounded(history, user) + self.push_bounded(history, assistant);
        let len = history.len();
        drop(conversations);

        debug!(
            conversation_id = %conversation_id,
            len,
            evicted,
            "Turn appended to in-memory history"
        );
        Ok(())
    }

    async fn read(&self, conversation_id: &ConversationId) -> Result<Vec<Message>> {
        let conversations = self.conversations.read().await;
        let history: Vec<Message> = conversations
            .get(conversation_id)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default();
        Ok(history)
    }

    async fn clear(&self, conversation_id: &ConversationId) -> Result<()> {
        let removed = self.conversations.write().await.remove(conversation_id);
        info!(
            conversation_id = %conversation_id,
            removed = removed.as_ref().map(|h| h.len()).unwrap_or(0),
            "In-memory history cleared"
        );
        Ok(())
    }

    async fn contains(&self, conversation_id: &ConversationId) -> Result<bool> {
        Ok(self
            .conversations
            .read()
            .await
            .get(conversation_id)
            .is_some_and(|h| !h.is_empty()))
    }
}
