//! # dbot-core
//!
//! Core types shared by every crate of the bot: conversation and model ids, history
//! [`Message`]s, the [`DbotError`] taxonomy, the transport-agnostic [`Bot`] trait used by the
//! front-end, and tracing initialization.

pub mod bot;
pub mod error;
pub mod logger;
pub mod types;

pub use bot::Bot;
pub use error::{DbotError, Result, TransportError, TransportErrorKind};
pub use logger::init_tracing;
pub use types::{
    Chat, ConversationId, IncomingMessage, Message, ModelId, Role, ToCoreMessage, ToCoreUser,
    User,
};
