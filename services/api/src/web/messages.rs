//! services/api/src/web/messages.rs
//!
//! The conversation attached to an advice request.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use guroosh_core::{
    not_blank, workflow, Message, Notification, NotificationKind, PortError, RequestStatus,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::ApiError,
    web::{
        extract::ValidJson, middleware::AuthUser, notify, requests::load_request,
        state::AppState, CountResponse, MessageResponse,
    },
};

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub request_id: Uuid,
    #[validate(
        length(max = 5000, message = "Message must be between 1 and 5000 characters"),
        custom(function = "not_blank", message = "Message cannot be empty")
    )]
    pub content: String,
}

#[derive(Deserialize, Validate, ToSchema)]
pub struct EditMessageRequest {
    #[validate(
        length(max = 5000, message = "Message must be between 1 and 5000 characters"),
        custom(function = "not_blank", message = "Message cannot be empty")
    )]
    pub content: String,
}

#[derive(Deserialize, IntoParams)]
pub struct SinceFilter {
    /// Only items created after this instant (RFC 3339).
    pub since: Option<DateTime<Utc>>,
}

/// Loads one of the actor's messages on a request that still takes messages.
async fn load_own_message(
    state: &AppState,
    message_id: Uuid,
    actor: Uuid,
) -> Result<Message, ApiError> {
    let message = state
        .advisory
        .get_message(message_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => ApiError::NotFound("Message not found".to_string()),
            other => ApiError::Port(other),
        })?;
    if message.sender_id != actor {
        return Err(ApiError::Forbidden(
            "Only the sender can change this message".to_string(),
        ));
    }
    let request = load_request(state, message.request_id, actor).await?;
    workflow::ensure_open(&request)?;
    Ok(message)
}

/// POST /api/messages - Send a message on an open request
#[utoipa::path(
    post,
    path = "/api/messages",
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message sent"),
        (status = 400, description = "The request no longer accepts messages"),
        (status = 403, description = "Caller is not a participant")
    ),
    security(("bearer" = [])),
    tag = "messages"
)]
pub async fn send_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(req): ValidJson<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut request = load_request(&state, req.request_id, auth.id).await?;
    workflow::ensure_open(&request)?;

    let now = Utc::now();
    // The conversation starts the work.
    if request.status == RequestStatus::Accepted {
        workflow::check_request_transition(&request, auth.id, RequestStatus::InProgress)?;
        request.status = RequestStatus::InProgress;
        request.updated_at = now;
        request = state.advisory.update_request(&request).await?;
    }

    let message = state
        .advisory
        .create_message(&Message::new(request.id, auth.id, &req.content, now))
        .await?;

    notify(
        &state,
        Notification::new(
            request.counterpart(auth.id),
            NotificationKind::Message,
            "New message",
            format!("New message on \"{}\"", request.topic),
            Some(format!("/requests/{}", request.id)),
            now,
        ),
    )
    .await;

    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/messages/request/{id} - The conversation, oldest first
#[utoipa::path(
    get,
    path = "/api/messages/request/{id}",
    params(("id" = Uuid, Path, description = "Request id"), SinceFilter),
    responses(
        (status = 200, description = "Messages of the request"),
        (status = 403, description = "Caller is not a participant")
    ),
    security(("bearer" = [])),
    tag = "messages"
)]
pub async fn list_messages_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(request_id): Path<Uuid>,
    Query(filter): Query<SinceFilter>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let request = load_request(&state, request_id, auth.id).await?;
    Ok(Json(
        state
            .advisory
            .list_messages(request.id, filter.since)
            .await?,
    ))
}

/// PUT /api/messages/request/{id}/read - Mark the other side's messages read
#[utoipa::path(
    put,
    path = "/api/messages/request/{id}/read",
    params(("id" = Uuid, Path, description = "Request id")),
    responses((status = 200, description = "How many messages changed", body = CountResponse)),
    security(("bearer" = [])),
    tag = "messages"
)]
pub async fn mark_read_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<CountResponse>, ApiError> {
    let request = load_request(&state, request_id, auth.id).await?;
    let count = state
        .advisory
        .mark_messages_read(request.id, auth.id)
        .await?;
    Ok(Json(CountResponse { count }))
}

/// GET /api/messages/unread-count
#[utoipa::path(
    get,
    path = "/api/messages/unread-count",
    responses((status = 200, description = "Unread messages addressed to the caller", body = CountResponse)),
    security(("bearer" = [])),
    tag = "messages"
)]
pub async fn unread_count_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.advisory.count_unread_messages(auth.id).await?;
    Ok(Json(CountResponse { count }))
}

/// PUT /api/messages/{id} - Edit one of the caller's messages
#[utoipa::path(
    put,
    path = "/api/messages/{id}",
    params(("id" = Uuid, Path, description = "Message id")),
    request_body = EditMessageRequest,
    responses(
        (status = 200, description = "The edited message"),
        (status = 400, description = "The request is closed"),
        (status = 403, description = "Caller is not the sender")
    ),
    security(("bearer" = [])),
    tag = "messages"
)]
pub async fn edit_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(message_id): Path<Uuid>,
    ValidJson(req): ValidJson<EditMessageRequest>,
) -> Result<Json<Message>, ApiError> {
    let mut message = load_own_message(&state, message_id, auth.id).await?;
    message.content = req.content.trim().to_string();
    message.edited_at = Some(Utc::now());
    Ok(Json(state.advisory.update_message(&message).await?))
}

/// DELETE /api/messages/{id}
#[utoipa::path(
    delete,
    path = "/api/messages/{id}",
    params(("id" = Uuid, Path, description = "Message id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 400, description = "The request is closed"),
        (status = 403, description = "Caller is not the sender")
    ),
    security(("bearer" = [])),
    tag = "messages"
)]
pub async fn delete_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(message_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let message = load_own_message(&state, message_id, auth.id).await?;
    state.advisory.delete_message(message.id).await?;
    Ok(MessageResponse::new("Message deleted"))
}
