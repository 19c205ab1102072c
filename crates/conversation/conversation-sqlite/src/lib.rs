//! # SQLite Conversation Store
//!
//! Persistent [`ConversationStore`] backend: histories survive restarts and are read back in
//! insertion order.
//!
//! ## Example
//!
//! ```rust,no_run
//! use conversation_sqlite::SqliteConversationStore;
//! use conversation_store::{ConversationStore, HistoryLimit};
//! use dbot_core::{ConversationId, Message};
//!
//! #[tokio::main]
//! async fn main() -> dbot_core::Result<()> {
//!     let store = SqliteConversationStore::new("./data/history.db", HistoryLimit::Unbounded).await?;
//!     store.append(&ConversationId::from(42), Message::user("hello")).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Database Schema
//!
//! ```sql
//! CREATE TABLE conversation_messages (
//!     seq INTEGER PRIMARY KEY AUTOINCREMENT,
//!     conversation_id TEXT NOT NULL,
//!     role TEXT NOT NULL,
//!     content TEXT NOT NULL,
//!     timestamp TEXT NOT NULL
//! );
//! ```
//!
//! `seq` is the ordering key; timestamps are informational only.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use conversation_store::{ConversationStore, HistoryLimit};
use dbot_core::{ConversationId, DbotError, Message, Result, Role};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, instrument};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

fn storage_err(e: sqlx::Error) -> DbotError {
    DbotError::Storage(e.to_string())
}

/// SQLite-based conversation store.
#[derive(Clone)]
pub struct SqliteConversationStore {
    pool: SqlitePool,
    limit: HistoryLimit,
}

impl SqliteConversationStore {
    /// Opens (creating if missing) the database file at `path` and ensures the schema exists.
    /// The parent directory is created when absent.
    pub async fn new(path: impl AsRef<Path>, limit: HistoryLimit) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir).await?;
            }
        }

        info!(path = %path.display(), limit = ?limit.max_messages(), "Opening SQLite conversation store");

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(storage_err)?;

        let store = Self { pool, limit };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversation_messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_conversation_messages_conversation
                ON conversation_messages(conversation_id, seq);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    fn row_to_message(row: &SqliteRow) -> std::result::Result<Message, sqlx::Error> {
        let role: String = row.try_get("role")?;
        let content: String = row.try_get("content")?;
        let timestamp: String = row.try_get("timestamp")?;

        let role = Role::from_str(&role).map_err(|e| {
            sqlx::Error::Decode(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e,
            )))
        })?;
        let timestamp = DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
            .with_timezone(&Utc);

        Ok(Message {
            role,
            content,
            timestamp,
        })
    }

    async fn insert(
        tx: &mut Transaction<'_, Sqlite>,
        conversation_id: &ConversationId,
        message: &Message,
    ) -> std::result::Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO conversation_messages (conversation_id, role, content, timestamp) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(conversation_id.as_str())
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.timestamp.to_rfc3339())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Deletes the oldest rows beyond the history limit. Returns how many were removed.
    async fn trim(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        conversation_id: &ConversationId,
    ) -> std::result::Result<u64, sqlx::Error> {
        let Some(max) = self.limit.max_messages() else {
            return Ok(0);
        };
        let result = sqlx::query(
            "DELETE FROM conversation_messages \
             WHERE conversation_id = ? AND seq NOT IN ( \
                 SELECT seq FROM conversation_messages \
                 WHERE conversation_id = ? ORDER BY seq DESC LIMIT ? \
             )",
        )
        .bind(conversation_id.as_str())
        .bind(conversation_id.as_str())
        .bind(max as i64)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn insert_all(
        &self,
        conversation_id: &ConversationId,
        messages: &[Message],
    ) -> std::result::Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for message in messages {
            Self::insert(&mut tx, conversation_id, message).await?;
        }
        let evicted = self.trim(&mut tx, conversation_id).await?;
        tx.commit().await?;
        Ok(evicted)
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    #[instrument(skip_all, fields(conversation_id = %conversation_id))]
    async fn append(&self, conversation_id: &ConversationId, message: Message) -> Result<()> {
        let evicted = self
            .insert_all(conversation_id, std::slice::from_ref(&message))
            .await
            .map_err(storage_err)?;
        debug!(role = %message.role, evicted, "Message appended to SQLite history");
        Ok(())
    }

    #[instrument(skip_all, fields(conversation_id = %conversation_id))]
    async fn append_turn(
        &self,
        conversation_id: &ConversationId,
        user: Message,
        assistant: Message,
    ) -> Result<()> {
        let evicted = self
            .insert_all(conversation_id, &[user, assistant])
            .await
            .map_err(storage_err)?;
        debug!(evicted, "Turn appended to SQLite history");
        Ok(())
    }

    async fn read(&self, conversation_id: &ConversationId) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT role, content, timestamp FROM conversation_messages \
             WHERE conversation_id = ? ORDER BY seq ASC",
        )
        .bind(conversation_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter()
            .map(Self::row_to_message)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(storage_err)
    }

    async fn clear(&self, conversation_id: &ConversationId) -> Result<()> {
        let result = sqlx::query("DELETE FROM conversation_messages WHERE conversation_id = ?")
            .bind(conversation_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        info!(
            conversation_id = %conversation_id,
            removed = result.rows_affected(),
            "SQLite history cleared"
        );
        Ok(())
    }

    async fn contains(&self, conversation_id: &ConversationId) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM conversation_messages WHERE conversation_id = ? LIMIT 1")
            .bind(conversation_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(row.is_some())
    }
}
