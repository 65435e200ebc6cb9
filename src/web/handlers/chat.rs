//! Chat handlers for Web API.

use axum::{
    extract::{ConnectInfo, Query, State},
    Json,
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::chat::{ChatLog, NewChatMessage, ANONYMOUS_SENDER};
use crate::web::dto::{ApiResponse, ChatMessageResponse, ChatPollQuery, PostChatRequest};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// POST /api/chat - Post a message.
///
/// The sender label is the provided name, or the client address otherwise.
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<PostChatRequest>,
) -> Result<Json<ApiResponse<ChatMessageResponse>>, ApiError> {
    let sender = match req.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => connect_info
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| ANONYMOUS_SENDER.to_string()),
    };

    let message = chat_log(&state)
        .post(&NewChatMessage::new(sender, req.content))
        .await?;

    tracing::debug!(message_id = message.id, "Chat message posted");

    Ok(Json(ApiResponse::new(message.into())))
}

/// GET /api/chat?after=<id> - Poll for messages newer than `after`.
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChatPollQuery>,
) -> Result<Json<ApiResponse<Vec<ChatMessageResponse>>>, ApiError> {
    let messages = chat_log(&state)
        .list_since(query.after, state.config.retention.max_age())
        .await?;

    Ok(Json(ApiResponse::new(
        messages.into_iter().map(ChatMessageResponse::from).collect(),
    )))
}

fn chat_log(state: &AppState) -> ChatLog<'_> {
    ChatLog::new(state.db.pool()).with_limits(
        state.config.chat.max_message_length,
        state.config.chat.max_sender_length,
    )
}
