//! File sharing module.
//!
//! This module provides the upload/download pipeline:
//! - Client path sanitization
//! - Batch-namespaced content storage
//! - The file catalog (SQLite)
//! - Range-aware streaming
//! - Time-based retention

mod catalog;
mod range;
mod retention;
mod sanitize;
mod service;
mod storage;
mod stream;

use std::fmt;

use uuid::Uuid;

pub use catalog::{FileCatalog, FileRecord, NewFileRecord};
pub use range::{resolve as resolve_range, ByteWindow, RangeResolution};
pub use retention::{RetentionSweeper, SweepReport, DEFAULT_MAX_AGE, DEFAULT_SWEEP_INTERVAL};
pub use sanitize::{sanitize, SanitizedPath, MAX_SEGMENT_BYTES};
pub use service::{FileService, UploadBatch};
pub use storage::{ContentStore, StoredObject};
pub use stream::{content_disposition, display_name, mime_for, read_exact_stream, serve, Disposition};

/// Namespace for the files of one upload request.
///
/// A v4 UUID in simple (hyphenless) form, used as the first path segment
/// under the content root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchId(String);

impl BatchId {
    /// Generate a fresh batch id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// The id as a path segment.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Format a byte count for display, e.g. `1536` -> `"1.50 KB"`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.2} {}", value, UNITS[unit])
}
