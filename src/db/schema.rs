//! Database schema and migrations for tempshare.
//!
//! Migrations are applied sequentially when the database is first opened or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Shared file catalog
    r#"
CREATE TABLE files (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    original_name   TEXT NOT NULL,            -- client-supplied relative path, display only
    stored_path     TEXT NOT NULL UNIQUE,     -- <batch_id>/<sanitized path> under the content root
    size_bytes      INTEGER NOT NULL CHECK (size_bytes >= 0),
    created_at      TEXT NOT NULL             -- fixed-width RFC3339 UTC
);

CREATE INDEX idx_files_created_at ON files(created_at);
"#,
    // v2: Chat messages
    r#"
CREATE TABLE chat_messages (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    sender      TEXT NOT NULL,
    content     TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE INDEX idx_chat_messages_created_at ON chat_messages(created_at);
"#,
];
