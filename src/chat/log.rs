//! Chat log storage.
//!
//! Messages share the file retention window and are removed by the same
//! sweep. Clients poll with the last id they have seen.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{sanitize_display, DEFAULT_MAX_MESSAGE_LENGTH, DEFAULT_MAX_SENDER_LENGTH};
use crate::db::{cutoff_for, format_timestamp, parse_timestamp};
use crate::{Result, ShareError};

/// A stored chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Message ID, increasing in posting order.
    pub id: i64,
    /// Sanitized sender label.
    pub sender: String,
    /// Sanitized message text.
    pub content: String,
    /// When the message was posted.
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ChatMessageRow {
    id: i64,
    sender: String,
    content: String,
    created_at: String,
}

impl TryFrom<ChatMessageRow> for ChatMessage {
    type Error = ShareError;

    fn try_from(row: ChatMessageRow) -> Result<Self> {
        let created_at = parse_timestamp(&row.created_at).ok_or_else(|| {
            ShareError::Database(format!(
                "invalid created_at {:?} for chat message {}",
                row.created_at, row.id
            ))
        })?;

        Ok(Self {
            id: row.id,
            sender: row.sender,
            content: row.content,
            created_at,
        })
    }
}

/// A message to be posted. Both fields are raw client input.
#[derive(Debug, Clone)]
pub struct NewChatMessage {
    /// Sender label, typically the client address.
    pub sender: String,
    /// Message text.
    pub content: String,
    /// Creation time; defaults to the time of posting.
    pub created_at: Option<DateTime<Utc>>,
}

impl NewChatMessage {
    /// Create a new message.
    pub fn new(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
            created_at: None,
        }
    }

    /// Set an explicit creation time.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// Chat log backed by the `chat_messages` table.
pub struct ChatLog<'a> {
    pool: &'a SqlitePool,
    max_message_length: usize,
    max_sender_length: usize,
}

impl<'a> ChatLog<'a> {
    /// Create a new ChatLog with default limits.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self {
            pool,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            max_sender_length: DEFAULT_MAX_SENDER_LENGTH,
        }
    }

    /// Override the message and sender length limits (in characters).
    pub fn with_limits(mut self, max_message_length: usize, max_sender_length: usize) -> Self {
        self.max_message_length = max_message_length;
        self.max_sender_length = max_sender_length;
        self
    }

    /// Validate, sanitize and store a message.
    pub async fn post(&self, message: &NewChatMessage) -> Result<ChatMessage> {
        let content = message.content.trim();
        if content.chars().all(|c| c.is_whitespace() || c.is_control()) {
            return Err(ShareError::Validation("message is empty".to_string()));
        }
        let length = content.chars().count();
        if length > self.max_message_length {
            return Err(ShareError::Validation(format!(
                "message is {length} characters, limit is {}",
                self.max_message_length
            )));
        }

        let sender = sanitize_display(&message.sender, self.max_sender_length);
        let content = sanitize_display(content, self.max_message_length);
        let created_at = message.created_at.unwrap_or_else(Utc::now);

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO chat_messages (sender, content, created_at)
             VALUES (?, ?, ?) RETURNING id",
        )
        .bind(&sender)
        .bind(&content)
        .bind(format_timestamp(&created_at))
        .fetch_one(self.pool)
        .await?;

        self.get(id)
            .await?
            .ok_or_else(|| ShareError::NotFound(format!("chat message {id}")))
    }

    /// Get a message by ID.
    pub async fn get(&self, id: i64) -> Result<Option<ChatMessage>> {
        let row = sqlx::query_as::<_, ChatMessageRow>(
            "SELECT id, sender, content, created_at FROM chat_messages WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(ChatMessage::try_from).transpose()
    }

    /// Messages newer than `after_id` inside the retention window, oldest first.
    pub async fn list_since(&self, after_id: i64, max_age: Duration) -> Result<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, ChatMessageRow>(
            "SELECT id, sender, content, created_at FROM chat_messages
             WHERE id > ? AND created_at >= ?
             ORDER BY id ASC",
        )
        .bind(after_id)
        .bind(cutoff_for(max_age))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(ChatMessage::try_from).collect()
    }

    /// Delete messages older than the retention window.
    pub async fn delete_expired(&self, max_age: Duration) -> Result<u64> {
        let result = sqlx::query("DELETE FROM chat_messages WHERE created_at < ?")
            .bind(cutoff_for(max_age))
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
