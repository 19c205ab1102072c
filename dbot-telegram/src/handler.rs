//! Chat handler: routes commands and runs chat turns through the response service.

use std::sync::Arc;
use std::time::Duration;

use dbot_core::{Bot, Chat, ConversationId, DbotError, IncomingMessage, Result, TransportErrorKind};
use response_service::ResponseService;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use crate::commands::{Command, HELP_TEXT};

pub const EMPTY_TEXT_REPLY: &str = "Please send a text message.";

/// Telegram clears the typing indicator after about 5 seconds.
const TYPING_INTERVAL: Duration = Duration::from_secs(5);

pub struct ChatHandler {
    service: Arc<ResponseService>,
    bot: Arc<dyn Bot>,
    thinking_message: String,
    fallback_on_rate_limit: bool,
    /// Set by the runner from `get_me`; used to accept `/cmd@botname`.
    bot_username: Arc<tokio::sync::RwLock<Option<String>>>,
}

impl ChatHandler {
    pub fn new(
        service: Arc<ResponseService>,
        bot: Arc<dyn Bot>,
        thinking_message: String,
        fallback_on_rate_limit: bool,
    ) -> Self {
        Self {
            service,
            bot,
            thinking_message,
            fallback_on_rate_limit,
            bot_username: Arc::new(tokio::sync::RwLock::new(None)),
        }
    }

    pub async fn set_bot_username(&self, username: Option<String>) {
        *self.bot_username.write().await = username;
    }

    /// Handles one incoming message: a command, or otherwise a chat turn.
    #[instrument(skip(self, message), fields(chat_id = message.chat.id, user_id = message.user.id))]
    pub async fn handle(&self, message: &IncomingMessage) -> Result<()> {
        let text = message.content.trim();
        if text.starts_with('/') {
            let username = self.bot_username.read().await.clone();
            return match Command::parse(text, username.as_deref()) {
                Some(command) => self.handle_command(&message.chat, command).await,
                None => Ok(()),
            };
        }
        self.handle_chat(message).await
    }

    async fn handle_command(&self, chat: &Chat, command: Command) -> Result<()> {
        info!(command = ?command, "Handling command");
        let reply = match command {
            Command::Start => format!("Hi! {}", HELP_TEXT),
            Command::Help => HELP_TEXT.to_string(),
            Command::Unknown(name) => format!("Unknown command /{}.\n\n{}", name, HELP_TEXT),
            Command::Reset => {
                self.service.reset(&chat.conversation_id()).await?;
                "Conversation history cleared. Let's start over.".to_string()
            }
            Command::Models => self.format_models(),
            Command::Model(None) => {
                format!("Current model: {}", self.service.selector().current())
            }
            Command::Model(Some(id)) => match self.service.selector().switch_to(&id) {
                Ok(model) => format!("Switched to model: {}", model),
                Err(DbotError::UnknownModel(_)) => {
                    format!("Unknown model: {}\n\n{}", id, self.format_models())
                }
                Err(e) => return Err(e),
            },
            Command::Next => match self.service.selector().advance() {
                Some(model) => format!("Switched to next model: {}", model),
                None => format!(
                    "Already on the last model ({}). Use /model <id> to pick another one.",
                    self.service.selector().current()
                ),
            },
        };
        self.bot.send_message(chat, &reply).await
    }

    fn format_models(&self) -> String {
        let selector = self.service.selector();
        let current = selector.current();
        let lines: Vec<String> = selector
            .list_available()
            .into_iter()
            .map(|model| {
                if model == current {
                    format!("> {} (current)", model)
                } else {
                    format!("  {}", model)
                }
            })
            .collect();
        format!("Available models:\n{}", lines.join("\n"))
    }

    async fn handle_chat(&self, message: &IncomingMessage) -> Result<()> {
        let chat = &message.chat;
        if message.content.trim().is_empty() {
            return self.bot.send_message(chat, EMPTY_TEXT_REPLY).await;
        }

        let placeholder = match self
            .bot
            .send_message_and_return_id(chat, &self.thinking_message)
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "Failed to send thinking message");
                None
            }
        };
        let typing = self.spawn_typing(chat.clone());

        let result = self
            .respond_with_fallback(&chat.conversation_id(), &message.content)
            .await;

        typing.abort();
        if let Some(id) = placeholder {
            if let Err(e) = self.bot.delete_message(chat, &id).await {
                warn!(error = %e, message_id = %id, "Failed to delete thinking message");
            }
        }

        match result {
            Ok(reply) => self.bot.send_message(chat, &reply).await,
            Err(e) => {
                error!(error = %e, "Chat turn failed");
                self.bot.send_message(chat, &format_error_reply(&e)).await
            }
        }
    }

    fn spawn_typing(&self, chat: Chat) -> JoinHandle<()> {
        let bot = self.bot.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = bot.send_typing(&chat).await {
                    warn!(error = %e, "Failed to send typing action");
                    break;
                }
                tokio::time::sleep(TYPING_INTERVAL).await;
            }
        })
    }

    /// Runs the turn, moving on through the registry (wrapping past the last model) while the
    /// current one is rate limited. Each model is tried at most once per turn.
    async fn respond_with_fallback(
        &self,
        conversation_id: &ConversationId,
        text: &str,
    ) -> Result<String> {
        let selector = self.service.selector();
        let max_attempts = selector.list_available().len();
        let mut attempt = 1;
        loop {
            let result = self.service.respond(conversation_id, text).await;
            let failed_model = match &result {
                Err(DbotError::TransportFailure { model, source })
                    if self.fallback_on_rate_limit
                        && matches!(
                            source.kind,
                            TransportErrorKind::RateLimited | TransportErrorKind::Timeout
                        ) =>
                {
                    model.clone()
                }
                _ => return result,
            };
            if attempt >= max_attempts {
                return result;
            }
            match selector.advance_from(&failed_model) {
                Some(next) => {
                    warn!(
                        failed_model = %failed_model,
                        next_model = %next,
                        attempt,
                        "Model unavailable, retrying with next model"
                    );
                }
                None => {
                    warn!(failed_model = %failed_model, "No more models to fall back to");
                    return result;
                }
            }
            attempt += 1;
        }
    }
}

/// Renders a failed turn as a message for the user.
pub fn format_error_reply(err: &DbotError) -> String {
    match err {
        DbotError::EmptyMessage => EMPTY_TEXT_REPLY.to_string(),
        DbotError::TransportFailure { model, source } => match source.kind {
            TransportErrorKind::RateLimited => format!(
                "The model {} is rate limited right now (free models have request limits).\n\n\
                 Try again in a minute, or switch with /next or /model <id>.",
                model
            ),
            TransportErrorKind::Unauthorized => {
                "The AI provider rejected the API key. Please check the bot's configuration."
                    .to_string()
            }
            TransportErrorKind::Timeout => format!(
                "The model {} took too long to answer. Please try again.",
                model
            ),
            _ => format!(
                "An error occurred while contacting the AI.\n\nDetails: {}\n\nPlease try again.",
                source
            ),
        },
        other => format!(
            "An error occurred while processing your message.\n\nDetails: {}",
            other
        ),
    }
}
