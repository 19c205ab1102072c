//! # Conversation Store
//!
//! Per-conversation message history behind the [`ConversationStore`] trait.
//!
//! ## Modules
//!
//! - [`store`] - ConversationStore trait (append / append_turn / read / clear / contains)
//! - [`inmemory`] - InMemoryConversationStore, the default backend
//! - [`limit`] - HistoryLimit, the per-conversation message bound shared by backends

pub mod inmemory;
pub mod limit;
pub mod store;

pub use inmemory::InMemoryConversationStore;
pub use limit::HistoryLimit;
pub use store::ConversationStore;
