//! tempshare - ephemeral file sharing
//!
//! Clients upload single files or whole directory trees over HTTP, others
//! download or stream them with Range support, and everything older than the
//! retention window is purged by a background sweep.

pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use chat::{sanitize_display, ChatLog, ChatMessage, NewChatMessage};
pub use config::Config;
pub use db::Database;
pub use error::{Result, ShareError};
pub use file::{
    format_size, sanitize, BatchId, ContentStore, Disposition, FileCatalog, FileRecord,
    FileService, RetentionSweeper, SanitizedPath, SweepReport, UploadBatch,
};
pub use web::WebServer;
