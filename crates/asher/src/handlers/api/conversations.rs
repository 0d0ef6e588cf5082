use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use super::UserId;
use crate::conversation::StoredMessage;
use crate::gateway::{BatchSend, SendMessage};
use crate::server::AppState;

#[derive(Deserialize)]
pub struct CreateConversationRequest {
    #[serde(default)]
    title: Option<String>,
}

#[derive(Serialize)]
pub struct MessagesResponse {
    conversation_id: String,
    messages: Vec<StoredMessage>,
}

/// POST /api/conversations
pub async fn create_conversation(
    State(state): State<AppState>,
    UserId(_user): UserId,
    Json(req): Json<CreateConversationRequest>,
) -> Response {
    match state.conversations.create_conversation(req.title).await {
        Ok(conversation) => (StatusCode::CREATED, Json(conversation)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/conversations/{conversation_id}/messages
pub async fn get_messages(
    State(state): State<AppState>,
    UserId(_user): UserId,
    Path(conversation_id): Path<String>,
) -> Response {
    match state.conversations.messages(&conversation_id).await {
        Ok(messages) => (
            StatusCode::OK,
            Json(MessagesResponse {
                conversation_id,
                messages,
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/conversations/{conversation_id}/messages
pub async fn send_message(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(conversation_id): Path<String>,
    Json(req): Json<SendMessage>,
) -> Response {
    match state
        .conversations
        .send_message(&conversation_id, &user, &req)
        .await
    {
        Ok(exchange) => (StatusCode::OK, Json(exchange)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/conversations/{conversation_id}/batch
pub async fn send_batch(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(conversation_id): Path<String>,
    Json(req): Json<BatchSend>,
) -> Response {
    match state
        .conversations
        .send_batch(&conversation_id, &user, &req)
        .await
    {
        Ok(batch) => (StatusCode::OK, Json(batch)).into_response(),
        Err(e) => e.into_response(),
    }
}
