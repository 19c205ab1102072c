//! Tests for [`dbot_telegram::ChatHandler`].
//!
//! Uses a recording MockBot and a per-model scripted LlmClient; does not call Telegram or any
//! LLM provider.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use conversation_store::{ConversationStore, InMemoryConversationStore};
use dbot_core::{
    Bot as CoreBot, Chat, IncomingMessage, Message, ModelId, Result as DbotResult,
    TransportError, TransportErrorKind, User,
};
use dbot_telegram::handler::EMPTY_TEXT_REPLY;
use dbot_telegram::ChatHandler;
use llm_client::LlmClient;
use model_selector::ModelSelector;
use response_service::ResponseService;

/// What the MockBot was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
enum BotCall {
    Send(String),
    Delete(String),
}

/// Mock Bot for tests: no network, records sends and deletes.
#[derive(Default)]
struct MockBot {
    calls: Mutex<Vec<BotCall>>,
    next_id: Mutex<u32>,
}

impl MockBot {
    fn calls(&self) -> Vec<BotCall> {
        self.calls.lock().unwrap().clone()
    }

    fn sent(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                BotCall::Send(text) => Some(text),
                BotCall::Delete(_) => None,
            })
            .collect()
    }

    fn last_sent(&self) -> String {
        self.sent().pop().unwrap_or_default()
    }
}

#[async_trait]
impl CoreBot for MockBot {
    async fn send_message(&self, _chat: &Chat, text: &str) -> DbotResult<()> {
        self.calls.lock().unwrap().push(BotCall::Send(text.to_string()));
        Ok(())
    }

    async fn send_message_and_return_id(&self, chat: &Chat, text: &str) -> DbotResult<String> {
        self.send_message(chat, text).await?;
        let mut id = self.next_id.lock().unwrap();
        *id += 1;
        Ok(id.to_string())
    }

    async fn delete_message(&self, _chat: &Chat, message_id: &str) -> DbotResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(BotCall::Delete(message_id.to_string()));
        Ok(())
    }

    async fn send_typing(&self, _chat: &Chat) -> DbotResult<()> {
        Ok(())
    }
}

/// LlmClient whose outcome depends on the requested model. Unscripted models echo.
#[derive(Default)]
struct PerModelLlm {
    failures: HashMap<String, TransportErrorKind>,
    models_called: Mutex<Vec<ModelId>>,
}

impl PerModelLlm {
    fn failing(models: &[(&str, TransportErrorKind)]) -> Self {
        Self {
            failures: models.iter().map(|(m, k)| (m.to_string(), *k)).collect(),
            models_called: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LlmClient for PerModelLlm {
    async fn complete(
        &self,
        model: &ModelId,
        _history: &[Message],
        user_text: &str,
    ) -> Result<String, TransportError> {
        self.models_called.lock().unwrap().push(model.clone());
        match self.failures.get(model.as_str()) {
            Some(kind) => Err(TransportError::new(*kind, "provider error")),
            None => Ok(format!("{} says: {}", model, user_text)),
        }
    }
}

struct Fixture {
    handler: ChatHandler,
    bot: Arc<MockBot>,
    llm: Arc<PerModelLlm>,
    store: Arc<InMemoryConversationStore>,
    selector: Arc<ModelSelector>,
}

fn fixture(llm: PerModelLlm, fallback: bool) -> Fixture {
    let bot = Arc::new(MockBot::default());
    let llm = Arc::new(llm);
    let store = Arc::new(InMemoryConversationStore::new());
    let selector = Arc::new(
        ModelSelector::new(
            vec![ModelId::from("m1"), ModelId::from("m2"), ModelId::from("m3")],
            None,
        )
        .unwrap(),
    );
    let service = Arc::new(ResponseService::new(
        store.clone(),
        selector.clone(),
        llm.clone(),
    ));
    let handler = ChatHandler::new(service, bot.clone(), "Thinking...".to_string(), fallback);
    Fixture {
        handler,
        bot,
        llm,
        store,
        selector,
    }
}

fn make_message(content: &str) -> IncomingMessage {
    IncomingMessage {
        id: "msg_1".to_string(),
        user: User {
            id: 123,
            username: Some("user".to_string()),
            first_name: Some("User".to_string()),
            last_name: None,
        },
        chat: Chat {
            id: 456,
            chat_type: "private".to_string(),
        },
        content: content.to_string(),
        created_at: Utc::now(),
    }
}

/// **Test: a chat turn sends the placeholder, deletes it, then sends the reply.**
#[tokio::test]
async fn test_chat_turn_replies_and_records_history() {
    let f = fixture(PerModelLlm::default(), true);
    let msg = make_message("hello");

    f.handler.handle(&msg).await.unwrap();

    assert_eq!(
        f.bot.calls(),
        vec![
            BotCall::Send("Thinking...".to_string()),
            BotCall::Delete("1".to_string()),
            BotCall::Send("m1 says: hello".to_string()),
        ]
    );
    let history = f.store.read(&msg.chat.conversation_id()).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "hello");
    assert_eq!(history[1].content, "m1 says: hello");
}

/// **Test: blank text gets a hint and never reaches the model.**
#[tokio::test]
async fn test_blank_text_gets_hint() {
    let f = fixture(PerModelLlm::default(), true);

    f.handler.handle(&make_message("   ")).await.unwrap();

    assert_eq!(f.bot.sent(), vec![EMPTY_TEXT_REPLY.to_string()]);
    assert!(f.llm.models_called.lock().unwrap().is_empty());
}

/// **Test: a rate-limited model is skipped and the next model answers.**
#[tokio::test]
async fn test_rate_limit_falls_back_to_next_model() {
    let f = fixture(
        PerModelLlm::failing(&[("m1", TransportErrorKind::RateLimited)]),
        true,
    );
    let msg = make_message("hi");

    f.handler.handle(&msg).await.unwrap();

    assert_eq!(f.bot.last_sent(), "m2 says: hi");
    assert_eq!(f.selector.current(), "m2");
    assert_eq!(
        *f.llm.models_called.lock().unwrap(),
        vec![ModelId::from("m1"), ModelId::from("m2")]
    );
    let history = f.store.read(&msg.chat.conversation_id()).await.unwrap();
    assert_eq!(history.len(), 2);
}

/// **Test: with fallback disabled the user sees the rate-limit reply and history stays empty.**
#[tokio::test]
async fn test_rate_limit_without_fallback_reports_error() {
    let f = fixture(
        PerModelLlm::failing(&[("m1", TransportErrorKind::RateLimited)]),
        false,
    );
    let msg = make_message("hi");

    f.handler.handle(&msg).await.unwrap();

    assert!(f.bot.last_sent().contains("/next"));
    assert_eq!(f.selector.current(), "m1");
    assert!(f.store.read(&msg.chat.conversation_id()).await.unwrap().is_empty());
}

/// **Test: when every model is rate limited each is tried once and the error is reported.**
#[tokio::test]
async fn test_fallback_exhausts_registry() {
    let f = fixture(
        PerModelLlm::failing(&[
            ("m1", TransportErrorKind::RateLimited),
            ("m2", TransportErrorKind::RateLimited),
            ("m3", TransportErrorKind::RateLimited),
        ]),
        true,
    );
    let msg = make_message("hi");

    f.handler.handle(&msg).await.unwrap();

    assert_eq!(f.llm.models_called.lock().unwrap().len(), 3);
    assert_eq!(f.selector.current(), "m3");
    assert!(f.bot.last_sent().contains("rate limited"));
    assert!(f.store.read(&msg.chat.conversation_id()).await.unwrap().is_empty());
}

/// **Test: a rate-limited last model wraps around to the first model.**
#[tokio::test]
async fn test_rate_limit_on_last_model_wraps_to_first() {
    let f = fixture(
        PerModelLlm::failing(&[("m3", TransportErrorKind::RateLimited)]),
        true,
    );
    f.selector.switch_to("m3").unwrap();
    let msg = make_message("hi");

    f.handler.handle(&msg).await.unwrap();

    assert_eq!(f.bot.last_sent(), "m1 says: hi");
    assert_eq!(f.selector.current(), "m1");
    assert_eq!(
        *f.llm.models_called.lock().unwrap(),
        vec![ModelId::from("m3"), ModelId::from("m1")]
    );
    let history = f.store.read(&msg.chat.conversation_id()).await.unwrap();
    assert_eq!(history.len(), 2);
}

/// **Test: non-retryable errors do not trigger fallback.**
#[tokio::test]
async fn test_unauthorized_does_not_fall_back() {
    let f = fixture(
        PerModelLlm::failing(&[("m1", TransportErrorKind::Unauthorized)]),
        true,
    );

    f.handler.handle(&make_message("hi")).await.unwrap();

    assert_eq!(f.llm.models_called.lock().unwrap().len(), 1);
    assert_eq!(f.selector.current(), "m1");
    assert!(f.bot.last_sent().contains("API key"));
}

/// **Test: /reset clears the chat's history.**
#[tokio::test]
async fn test_reset_clears_history() {
    let f = fixture(PerModelLlm::default(), true);
    let msg = make_message("remember me");
    f.handler.handle(&msg).await.unwrap();
    let conv = msg.chat.conversation_id();
    assert!(f.store.contains(&conv).await.unwrap());

    f.handler.handle(&make_message("/reset")).await.unwrap();

    assert!(f.store.read(&conv).await.unwrap().is_empty());
    assert!(f.bot.last_sent().contains("cleared"));
}

/// **Test: /model switches, /model alone shows current, unknown ids list the registry.**
#[tokio::test]
async fn test_model_command() {
    let f = fixture(PerModelLlm::default(), true);

    f.handler.handle(&make_message("/model m3")).await.unwrap();
    assert_eq!(f.selector.current(), "m3");
    assert!(f.bot.last_sent().contains("m3"));

    f.handler.handle(&make_message("/model")).await.unwrap();
    assert_eq!(f.bot.last_sent(), "Current model: m3");

    f.handler.handle(&make_message("/model gpt-nope")).await.unwrap();
    let reply = f.bot.last_sent();
    assert!(reply.contains("Unknown model: gpt-nope"));
    assert!(reply.contains("m1") && reply.contains("m2"));
    assert_eq!(f.selector.current(), "m3");
}

/// **Test: /models marks the current model; /next advances it.**
#[tokio::test]
async fn test_models_and_next_commands() {
    let f = fixture(PerModelLlm::default(), true);

    f.handler.handle(&make_message("/models")).await.unwrap();
    assert!(f.bot.last_sent().contains("> m1 (current)"));

    f.handler.handle(&make_message("/next")).await.unwrap();
    assert_eq!(f.selector.current(), "m2");

    f.handler.handle(&make_message("/next")).await.unwrap();
    f.handler.handle(&make_message("/next")).await.unwrap();
    assert_eq!(f.selector.current(), "m3");
    assert!(f.bot.last_sent().contains("last model"));
}

/// **Test: commands addressed to another bot are ignored; unknown commands get help.**
#[tokio::test]
async fn test_command_addressing_and_unknown() {
    let f = fixture(PerModelLlm::default(), true);
    f.handler.set_bot_username(Some("dbot".to_string())).await;

    f.handler.handle(&make_message("/help@other_bot")).await.unwrap();
    assert!(f.bot.calls().is_empty());

    f.handler.handle(&make_message("/help@dbot")).await.unwrap();
    assert!(f.bot.last_sent().contains("/reset"));

    f.handler.handle(&make_message("/weather")).await.unwrap();
    assert!(f.bot.last_sent().starts_with("Unknown command /weather"));
    assert!(f.llm.models_called.lock().unwrap().is_empty());
}
