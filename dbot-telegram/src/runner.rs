//! REPL runner: converts teloxide messages to core messages and hands each to the chat handler
//! on its own task.

use std::sync::Arc;

use anyhow::Result;
use dbot_core::ToCoreMessage;
use teloxide::prelude::*;
use tracing::{error, info, instrument, warn};

use crate::adapters::TelegramMessageWrapper;
use crate::commands::Command;
use crate::handler::ChatHandler;

/// Registers the command menu, learns the bot's username, then runs the REPL until shutdown.
#[instrument(skip(bot, handler))]
pub async fn run_repl(bot: teloxide::Bot, handler: Arc<ChatHandler>) -> Result<()> {
    if let Err(e) = bot.set_my_commands(Command::menu()).await {
        warn!(error = %e, "Failed to register bot commands");
    }

    match bot.get_me().await {
        Ok(me) => {
            if let Some(username) = &me.user.username {
                info!(username = %username, "Bot username set before repl");
            }
            handler.set_bot_username(me.user.username.clone()).await;
        }
        Err(e) => warn!(error = %e, "get_me failed; accepting any /command@suffix"),
    }

    teloxide::repl(bot, move |_bot: Bot, msg: teloxide::types::Message| {
        let handler = handler.clone();

        async move {
            let core_msg = TelegramMessageWrapper(&msg).to_core();

            match msg.text() {
                Some(text) => info!(
                    user_id = core_msg.user.id,
                    chat_id = core_msg.chat.id,
                    message_content = %text,
                    "Received message"
                ),
                None => info!(
                    user_id = core_msg.user.id,
                    chat_id = core_msg.chat.id,
                    "Received non-text message"
                ),
            }

            tokio::spawn(async move {
                if let Err(e) = handler.handle(&core_msg).await {
                    error!(error = %e, chat_id = core_msg.chat.id, "Message handling failed");
                }
            });

            Ok(())
        }
    })
    .await;

    Ok(())
}
