//! Direct messages between any two users.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::types::{parse_id, ApiContext};
use crate::api::validation::{validate_uuid, ValidatedJson};
use crate::authorization::Caller;
use crate::db::repository::{
    conversation_between, get_message, get_user, insert_message, list_conversations,
    mark_message_read,
};
use crate::models::{ConversationSummary, Message};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[validate(custom(function = "validate_uuid"))]
    pub receiver_id: String,
    #[validate(length(min = 1, max = 5000, message = "Content must be 1-5000 characters"))]
    pub content: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentResponse {
    pub message: &'static str,
    pub sent_message: Message,
}

#[derive(Serialize)]
pub struct ConversationResponse {
    pub messages: Vec<Message>,
}

#[derive(Serialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<ConversationSummary>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResponse {
    pub message: &'static str,
    pub read_message: Message,
}

/// `POST /message`
pub async fn send(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    ValidatedJson(req): ValidatedJson<SendMessageRequest>,
) -> Result<(StatusCode, Json<SentResponse>), ApiError> {
    let receiver_id = parse_id(&req.receiver_id, "Receiver")?;
    let conn = ctx.core.open_db()?;
    get_user(&conn, &receiver_id)?.ok_or_else(|| ApiError::not_found("Receiver"))?;

    let message = Message {
        id: Uuid::new_v4(),
        sender_id: caller.user.id,
        receiver_id,
        content: req.content,
        sent_at: Utc::now(),
        read_at: None,
    };
    insert_message(&conn, &message)?;

    tracing::debug!(message_id = %message.id, sender = %message.sender_id, "message sent");
    Ok((
        StatusCode::CREATED,
        Json(SentResponse {
            message: "Message sent successfully",
            sent_message: message,
        }),
    ))
}

/// `GET /message/conversation/:userId`
pub async fn conversation(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(other_id): Path<String>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let other_id = parse_id(&other_id, "User")?;
    let conn = ctx.core.open_db()?;
    get_user(&conn, &other_id)?.ok_or_else(|| ApiError::not_found("User"))?;
    let messages = conversation_between(&conn, &caller.user.id, &other_id)?;
    Ok(Json(ConversationResponse { messages }))
}

/// `GET /message/conversations`
pub async fn conversations(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ConversationsResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let conversations = list_conversations(&conn, &caller.user.id)?;
    Ok(Json(ConversationsResponse { conversations }))
}

/// `PUT /message/:id/read`: receiver only; repeated calls keep the first read time.
pub async fn mark_read(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(message_id): Path<String>,
) -> Result<Json<ReadResponse>, ApiError> {
    let message_id = parse_id(&message_id, "Message")?;
    let conn = ctx.core.open_db()?;
    get_message(&conn, &message_id)?
        .filter(|m| m.receiver_id == caller.user.id)
        .ok_or_else(|| ApiError::not_found("Message"))?;

    mark_message_read(&conn, &message_id, Utc::now())?;
    let read_message =
        get_message(&conn, &message_id)?.ok_or_else(|| ApiError::not_found("Message"))?;

    Ok(Json(ReadResponse {
        message: "Message marked as read",
        read_message,
    }))
}
