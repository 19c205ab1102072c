//! Component factory: assembles store, selector, transport and response service from config.

use std::sync::Arc;

use anyhow::Result;
use conversation_sqlite::SqliteConversationStore;
use conversation_store::{ConversationStore, InMemoryConversationStore};
use llm_client::{LlmClient, OpenAILlmClient};
use model_selector::ModelSelector;
use response_service::ResponseService;
use tracing::{error, info, instrument};

use crate::bot_adapter::TelegramBotAdapter;
use crate::config::{BotConfig, HistoryStoreKind};
use crate::handler::ChatHandler;

pub struct BotComponents {
    pub teloxide_bot: teloxide::Bot,
    pub bot_adapter: Arc<dyn dbot_core::Bot>,
    pub service: Arc<ResponseService>,
}

/// Opens the conversation store selected by `HISTORY_STORE`.
#[instrument(skip(config))]
pub async fn create_conversation_store(config: &BotConfig) -> Result<Arc<dyn ConversationStore>> {
    let store: Arc<dyn ConversationStore> = match config.history_store {
        HistoryStoreKind::Sqlite => {
            info!(
                db_path = %config.history_sqlite_path.display(),
                "Using SQLite conversation store"
            );
            Arc::new(
                SqliteConversationStore::new(&config.history_sqlite_path, config.history_limit)
                    .await
                    .map_err(|e| {
                        error!(error = %e, "Failed to initialize SQLite store");
                        anyhow::anyhow!("Failed to initialize SQLite store: {}", e)
                    })?,
            )
        }
        HistoryStoreKind::Memory => {
            info!("Using in-memory conversation store");
            Arc::new(InMemoryConversationStore::with_limit(config.history_limit))
        }
    };
    Ok(store)
}

pub fn create_model_selector(config: &BotConfig) -> Result<Arc<ModelSelector>> {
    let selector = ModelSelector::new(
        config.registry.models.clone(),
        config.registry.default_model.clone(),
    )?;
    Ok(Arc::new(selector))
}

fn create_teloxide_bot(config: &BotConfig) -> teloxide::Bot {
    let bot = teloxide::Bot::new(config.bot_token.clone());
    match config.telegram_api_url {
        Some(ref url_str) => match reqwest::Url::parse(url_str) {
            Ok(url) => bot.set_api_url(url),
            Err(e) => {
                error!(error = %e, url = %url_str, "Invalid TELEGRAM_API_URL, using default");
                bot
            }
        },
        None => bot,
    }
}

/// Builds all components. `transport` replaces the OpenAI client when given (tests).
#[instrument(skip(config, transport))]
pub async fn build_components(
    config: &BotConfig,
    transport: Option<Arc<dyn LlmClient>>,
) -> Result<BotComponents> {
    let store = create_conversation_store(config).await?;
    let selector = create_model_selector(config)?;
    let transport =
        transport.unwrap_or_else(|| Arc::new(OpenAILlmClient::from_config(&config.llm)));

    let service = Arc::new(
        ResponseService::new(store, selector, transport).with_timeout(config.llm_timeout()),
    );

    let teloxide_bot = create_teloxide_bot(config);
    let bot_adapter: Arc<dyn dbot_core::Bot> =
        Arc::new(TelegramBotAdapter::new(teloxide_bot.clone()));

    Ok(BotComponents {
        teloxide_bot,
        bot_adapter,
        service,
    })
}

pub fn build_chat_handler(config: &BotConfig, components: &BotComponents) -> Arc<ChatHandler> {
    Arc::new(ChatHandler::new(
        components.service.clone(),
        components.bot_adapter.clone(),
        config.thinking_message.clone(),
        config.fallback_on_rate_limit,
    ))
}
