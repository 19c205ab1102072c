//! # dbot-cli
//!
//! Argument parsing and config loading for the `dbot` binary.

pub mod cli;

pub use cli::{format_registry, load_config, load_selector, Cli, Commands};
pub use dbot_telegram::BotConfig;
