//! Slash command parsing.

use teloxide::types::BotCommand;

/// A command addressed to this bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// `/reset`, `/new` or `/chatgpt`: forget the chat's history.
    Reset,
    Models,
    /// `/model` shows the current model; `/model <id>` switches to it.
    Model(Option<String>),
    Next,
    Unknown(String),
}

impl Command {
    /// Parses `text` as a command.
    ///
    /// Returns `None` when `text` is not a command, or when it is addressed to a different bot
    /// (`/help@other_bot`). The `@name` suffix is compared case-insensitively with `bot_username`;
    /// with no known username any suffix is accepted.
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Command> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };
        let name = match head.split_once('@') {
            Some((name, target)) => {
                if let Some(me) = bot_username {
                    if !target.eq_ignore_ascii_case(me) {
                        return None;
                    }
                }
                name
            }
            None => head,
        };
        if name.is_empty() {
            return None;
        }

        let command = match name.to_lowercase().as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "reset" | "new" | "chatgpt" => Command::Reset,
            "models" => Command::Models,
            "model" => Command::Model(args.split_whitespace().next().map(str::to_string)),
            "next" => Command::Next,
            other => Command::Unknown(other.to_string()),
        };
        Some(command)
    }

    /// Commands advertised in the Telegram client menu.
    pub fn menu() -> Vec<BotCommand> {
        vec![
            BotCommand::new("start", "Start the bot"),
            BotCommand::new("help", "Show usage"),
            BotCommand::new("reset", "Forget this chat's history"),
            BotCommand::new("models", "List available models"),
            BotCommand::new("model", "Show or switch the model: /model <id>"),
            BotCommand::new("next", "Switch to the next model"),
        ]
    }
}

pub const HELP_TEXT: &str = "I answer your messages with a language model and remember the conversation.\n\n\
Commands:\n\
/reset - forget this chat's history (also /new)\n\
/models - list available models\n\
/model <id> - switch model (without <id>: show the current one)\n\
/next - switch to the next model in the list\n\
/help - show this message";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(Command::parse("hello there", Some("dbot")), None);
        assert_eq!(Command::parse("", None), None);
        assert_eq!(Command::parse("/", None), None);
    }

    #[test]
    fn test_basic_commands() {
        assert_eq!(Command::parse("/start", None), Some(Command::Start));
        assert_eq!(Command::parse("/help", None), Some(Command::Help));
        assert_eq!(Command::parse("/models", None), Some(Command::Models));
        assert_eq!(Command::parse("/next", None), Some(Command::Next));
    }

    #[test]
    fn test_reset_aliases() {
        for text in ["/reset", "/new", "/chatgpt", "/RESET"] {
            assert_eq!(Command::parse(text, None), Some(Command::Reset), "{}", text);
        }
    }

    #[test]
    fn test_model_with_and_without_argument() {
        assert_eq!(Command::parse("/model", None), Some(Command::Model(None)));
        assert_eq!(
            Command::parse("/model   deepseek/deepseek-chat:free  ", None),
            Some(Command::Model(Some("deepseek/deepseek-chat:free".to_string())))
        );
    }

    #[test]
    fn test_bot_username_suffix() {
        assert_eq!(Command::parse("/help@DBot", Some("dbot")), Some(Command::Help));
        assert_eq!(Command::parse("/help@other_bot", Some("dbot")), None);
        assert_eq!(Command::parse("/help@anyone", None), Some(Command::Help));
        assert_eq!(
            Command::parse("/model@dbot gpt-4o", Some("dbot")),
            Some(Command::Model(Some("gpt-4o".to_string())))
        );
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            Command::parse("/weather now", None),
            Some(Command::Unknown("weather".to_string()))
        );
    }
}
