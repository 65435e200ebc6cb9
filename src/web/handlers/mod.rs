//! API handlers for the file sharing service.

pub mod chat;
pub mod file;

pub use chat::*;
pub use file::*;

use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;
use crate::file::{ContentStore, FileService};

/// Shared state for all handlers.
pub struct AppState {
    /// Metadata database.
    pub db: Arc<Database>,
    /// Content store holding the uploaded bytes.
    pub store: ContentStore,
    /// Application configuration.
    pub config: Config,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Arc<Database>, store: ContentStore, config: Config) -> Self {
        Self { db, store, config }
    }

    /// File operations bound to this state's retention window.
    pub fn files(&self) -> FileService<'_> {
        FileService::new(&self.db, &self.store, self.config.retention.max_age())
    }
}
