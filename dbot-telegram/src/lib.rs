//! # dbot-telegram
//!
//! Telegram front-end: configuration, teloxide adapters, the [`dbot_core::Bot`] implementation,
//! command parsing, the chat handler and the REPL runner. Conversation logic lives in
//! `response-service`; this crate only turns Telegram updates into turns and replies.

mod adapters;
mod bot_adapter;
pub mod commands;
pub mod components;
mod config;
pub mod handler;
mod runner;

pub use adapters::{TelegramMessageWrapper, TelegramUserWrapper};
pub use bot_adapter::TelegramBotAdapter;
pub use commands::Command;
pub use components::{build_chat_handler, build_components, BotComponents};
pub use config::{
    parse_model_list, BotConfig, HistoryStoreKind, ModelRegistryConfig, FREE_MODELS,
};
pub use handler::{format_error_reply, ChatHandler};
pub use runner::run_repl;

use anyhow::Result;
use dbot_core::init_tracing;
use tracing::info;

/// Main entry: init logging, build components and the chat handler, then run the REPL.
pub async fn run_bot(config: BotConfig) -> Result<()> {
    init_tracing(config.log_file.as_deref())?;

    info!(
        models = config.registry.models.len(),
        history_store = ?config.history_store,
        history_limit = ?config.history_limit.max_messages(),
        fallback_on_rate_limit = config.fallback_on_rate_limit,
        "Initializing bot"
    );

    let components = build_components(&config, None).await?;
    let handler = build_chat_handler(&config, &components);

    info!(
        current_model = %components.service.selector().current(),
        "Bot started successfully"
    );

    run_repl(components.teloxide_bot, handler).await
}
