//! CLI parser and config loading.

use anyhow::Result;
use clap::{Parser, Subcommand};
use dbot_telegram::{BotConfig, ModelRegistryConfig};
use model_selector::ModelSelector;

#[derive(Parser)]
#[command(name = "dbot")]
#[command(about = "Telegram LLM chat bot with per-chat history and switchable models", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the Telegram bot (config from env; token can override BOT_TOKEN).
    Run {
        #[arg(short, long)]
        token: Option<String>,
    },
    /// Print the configured model registry (LLM_MODELS / DEFAULT_MODEL) without starting the bot.
    Models,
}

/// Load BotConfig from environment. If `token` is provided it overrides BOT_TOKEN.
pub fn load_config(token: Option<String>) -> Result<BotConfig> {
    Ok(BotConfig::load(token)?)
}

/// Builds the selector the bot would start with, so duplicates and an unknown default are
/// handled exactly as at startup.
pub fn load_selector(registry: ModelRegistryConfig) -> Result<ModelSelector> {
    Ok(ModelSelector::new(registry.models, registry.default_model)?)
}

/// Renders the registry, one model per line, marking the current selection with `*`.
pub fn format_registry(selector: &ModelSelector) -> String {
    let current = selector.current();
    selector
        .list_available()
        .into_iter()
        .map(|model| {
            let marker = if model == current { '*' } else { ' ' };
            format!("{} {}", marker, model)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
