//! Chat module.
//!
//! A simple polling chat that lives next to the shared files:
//! - Append-only message log
//! - Polling by last seen message id
//! - Same retention window as files

mod log;

pub use log::{ChatLog, ChatMessage, NewChatMessage};

/// Default maximum message length (in characters).
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 1000;

/// Default maximum sender label length (in characters).
pub const DEFAULT_MAX_SENDER_LENGTH: usize = 64;

/// Label used when a sender label sanitizes to nothing.
pub const ANONYMOUS_SENDER: &str = "anonymous";

/// Normalize a client-supplied display string.
///
/// Control characters other than newline and tab are removed, the result is
/// trimmed and cut to `max_chars` characters, and HTML-significant characters
/// are escaped. Truncation happens before escaping, so an entity is never cut
/// in half.
pub fn sanitize_display(raw: &str, max_chars: usize) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();
    let trimmed: String = cleaned.trim().chars().take(max_chars).collect();

    if trimmed.trim().is_empty() {
        return ANONYMOUS_SENDER.to_string();
    }

    let mut escaped = String::with_capacity(trimmed.len());
    for c in trimmed.trim_end().chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}
