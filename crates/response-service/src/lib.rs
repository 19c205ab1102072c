//! # Response Service
//!
//! Runs one turn: read the conversation's history, ask the current model for a reply through
//! the [`LlmClient`] transport, and record the exchange.
//!
//! History is only written after a successful reply. A failed, timed out or cancelled turn
//! leaves it exactly as it was, so the caller may retry (e.g. with another model).

use std::sync::Arc;
use std::time::Duration;

use conversation_store::ConversationStore;
use dbot_core::{
    ConversationId, DbotError, Message, Result, TransportError, TransportErrorKind,
};
use llm_client::LlmClient;
use model_selector::ModelSelector;
use tracing::{debug, info, instrument, warn};

mod turn_lock;

use turn_lock::TurnLocks;

/// Transport timeout applied unless [`ResponseService::with_timeout`] overrides it.
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(60);

pub struct ResponseService {
    store: Arc<dyn ConversationStore>,
    selector: Arc<ModelSelector>,
    transport: Arc<dyn LlmClient>,
    timeout: Duration,
    turn_locks: TurnLocks,
}

impl ResponseService {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        selector: Arc<ModelSelector>,
        transport: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            store,
            selector,
            transport,
            timeout: DEFAULT_TURN_TIMEOUT,
            turn_locks: TurnLocks::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn selector(&self) -> &Arc<ModelSelector> {
        &self.selector
    }

    /// Forgets the conversation's history.
    ///
    /// Waits for a running turn of the same conversation to finish first, so its exchange cannot
    /// be appended after the clear.
    #[instrument(skip(self), fields(conversation_id = %conversation_id))]
    pub async fn reset(&self, conversation_id: &ConversationId) -> Result<()> {
        let _turn = self.turn_locks.acquire(conversation_id).await;
        self.store.clear(conversation_id).await?;
        info!("Conversation reset");
        Ok(())
    }

    /// Produces the reply to `user_text` in `conversation_id` with the currently selected model.
    ///
    /// On success the user message and the reply are appended as one turn. Turns of the same
    /// conversation are serialized; turns of different conversations run concurrently.
    ///
    /// # Errors
    ///
    /// - [`DbotError::EmptyMessage`] for blank text.
    /// - [`DbotError::TransportFailure`] when the model fails or exceeds the timeout.
    /// - [`DbotError::Storage`] when the history backend fails.
    #[instrument(skip(self, user_text), fields(conversation_id = %conversation_id))]
    pub async fn respond(&self, conversation_id: &ConversationId, user_text: &str) -> Result<String> {
        if user_text.trim().is_empty() {
            return Err(DbotError::EmptyMessage);
        }

        let _turn = self.turn_locks.acquire(conversation_id).await;

        let history = self.store.read(conversation_id).await?;
        let model = self.selector.current();
        debug!(
            model = %model,
            history_len = history.len(),
            "Requesting reply"
        );

        let outcome = match tokio::time::timeout(
            self.timeout,
            self.transport.complete(&model, &history, user_text),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::new(
                TransportErrorKind::Timeout,
                format!("no reply within {:?}", self.timeout),
            )),
        };

        match outcome {
            Ok(reply) => {
                self.store
                    .append_turn(
                        conversation_id,
                        Message::user(user_text),
                        Message::assistant(reply.clone()),
                    )
                    .await?;
                info!(model = %model, reply_len = reply.len(), "Turn completed");
                Ok(reply)
            }
            Err(source) => {
                warn!(
                    model = %model,
                    kind = source.kind.as_str(),
                    error = %source.message,
                    "Turn failed, history unchanged"
                );
                Err(DbotError::TransportFailure {
                    model: model.to_string(),
                    source,
                })
            }
        }
    }
}
