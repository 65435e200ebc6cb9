//! Response DTOs for Web API.

use std::time::Duration;

use serde::Serialize;

use crate::chat::ChatMessage;
use crate::file::{display_name, format_size, mime_for, FileRecord};

// ============================================================================
// Generic Response Wrappers
// ============================================================================

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

// ============================================================================
// File DTOs
// ============================================================================

/// File information in responses.
#[derive(Debug, Serialize)]
pub struct FileResponse {
    /// File ID.
    pub id: i64,
    /// Relative path as sent by the uploader.
    pub original_name: String,
    /// Last path segment, used as the download name.
    pub file_name: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Human-readable size, e.g. `1.50 KB`.
    pub size_human: String,
    /// Inferred MIME type.
    pub mime_type: String,
    /// Upload timestamp.
    pub created_at: String,
    /// When the file will be purged.
    pub expires_at: String,
}

impl FileResponse {
    /// Build a response for a record under the given retention window.
    pub fn from_record(record: &FileRecord, max_age: Duration) -> Self {
        let expires_at = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| record.created_at.checked_add_signed(age))
            .unwrap_or(record.created_at);

        Self {
            id: record.id,
            original_name: record.original_name.clone(),
            file_name: display_name(&record.original_name).to_string(),
            size_bytes: record.size_bytes,
            size_human: format_size(record.size_bytes),
            mime_type: mime_for(&record.original_name),
            created_at: record.created_at.to_rfc3339(),
            expires_at: expires_at.to_rfc3339(),
        }
    }
}

/// Result of a multi-file upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Namespace the files were stored under.
    pub batch_id: String,
    /// Successfully ingested files, in upload order.
    pub uploaded: Vec<FileResponse>,
    /// Parts that were rejected or failed.
    pub skipped: usize,
}

/// Result of an explicit delete.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// ID of the deleted file.
    pub id: i64,
    /// Always true.
    pub deleted: bool,
}

// ============================================================================
// Chat DTOs
// ============================================================================

/// Chat message in responses.
#[derive(Debug, Serialize)]
pub struct ChatMessageResponse {
    /// Message ID. Pass the highest seen ID as `after` when polling.
    pub id: i64,
    /// Sender label.
    pub sender: String,
    /// Message text.
    pub content: String,
    /// Posting timestamp.
    pub created_at: String,
}

impl From<ChatMessage> for ChatMessageResponse {
    fn from(message: ChatMessage) -> Self {
        Self {
            id: message.id,
            sender: message.sender,
            content: message.content,
            created_at: message.created_at.to_rfc3339(),
        }
    }
}
