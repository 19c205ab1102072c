//! Wraps teloxide::Bot and implements [`dbot_core::Bot`]. Tests substitute a recording mock.

use async_trait::async_trait;
use dbot_core::{Bot as CoreBot, Chat, DbotError, Result};
use teloxide::{
    prelude::*,
    types::{ChatAction, ChatId, MessageId},
};

pub struct TelegramBotAdapter {
    bot: teloxide::Bot,
}

impl TelegramBotAdapter {
    pub fn new(bot: teloxide::Bot) -> Self {
        Self { bot }
    }

    /// The underlying teloxide::Bot for direct API use.
    pub fn inner(&self) -> &teloxide::Bot {
        &self.bot
    }
}

fn bot_err(e: teloxide::RequestError) -> DbotError {
    DbotError::Bot(e.to_string())
}

#[async_trait]
impl CoreBot for TelegramBotAdapter {
    async fn send_message(&self, chat: &Chat, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat.id), text.to_string())
            .await
            .map_err(bot_err)?;
        Ok(())
    }

    async fn send_message_and_return_id(&self, chat: &Chat, text: &str) -> Result<String> {
        let sent = self
            .bot
            .send_message(ChatId(chat.id), text.to_string())
            .await
            .map_err(bot_err)?;
        Ok(sent.id.to_string())
    }

    async fn delete_message(&self, chat: &Chat, message_id: &str) -> Result<()> {
        let id: i32 = message_id
            .parse()
            .map_err(|_| DbotError::Bot(format!("Invalid message_id for delete: {}", message_id)))?;
        self.bot
            .delete_message(ChatId(chat.id), MessageId(id))
            .await
            .map_err(bot_err)?;
        Ok(())
    }

    async fn send_typing(&self, chat: &Chat) -> Result<()> {
        self.bot
            .send_chat_action(ChatId(chat.id), ChatAction::Typing)
            .await
            .map_err(bot_err)?;
        Ok(())
    }
}
