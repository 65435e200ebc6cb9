//! Request DTOs for Web API.

use serde::Deserialize;

/// Chat post request.
#[derive(Debug, Deserialize)]
pub struct PostChatRequest {
    /// Message text.
    pub content: String,
    /// Optional display name; the client address is used when absent.
    #[serde(default)]
    pub name: Option<String>,
}

/// Chat polling query.
#[derive(Debug, Default, Deserialize)]
pub struct ChatPollQuery {
    /// Return messages with an ID greater than this.
    #[serde(default)]
    pub after: i64,
}
