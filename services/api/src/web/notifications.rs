//! services/api/src/web/notifications.rs
//!
//! The caller's notification inbox and the admin broadcast that fans one
//! announcement out to every account in an audience.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use guroosh_core::{not_blank, Audience, Notification, NotificationKind, PortError, Role};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::ApiError,
    web::{
        extract::ValidJson, middleware::AuthUser, state::AppState, CountResponse,
        MessageResponse,
    },
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFilter {
    /// Only notifications not yet read.
    #[serde(default)]
    pub unread_only: bool,
    /// Only notifications created after this instant (RFC 3339).
    pub since: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Validate, ToSchema)]
pub struct BroadcastRequest {
    #[validate(
        length(max = 200, message = "Title must be between 1 and 200 characters"),
        custom(function = "not_blank", message = "Title is required")
    )]
    pub title: String,
    #[validate(
        length(max = 2000, message = "Message must be between 1 and 2000 characters"),
        custom(function = "not_blank", message = "Message is required")
    )]
    pub message: String,
    /// `all`, `advisors` or `clients`.
    pub audience: String,
}

#[derive(Serialize, ToSchema)]
pub struct BroadcastResponse {
    pub delivered: usize,
}

fn not_found(e: PortError) -> ApiError {
    match e {
        PortError::NotFound(_) => ApiError::NotFound("Notification not found".to_string()),
        other => ApiError::Port(other),
    }
}

/// GET /api/notifications - The caller's notifications, newest first
#[utoipa::path(
    get,
    path = "/api/notifications",
    params(NotificationFilter),
    responses((status = 200, description = "Notifications")),
    security(("bearer" = [])),
    tag = "notifications"
)]
pub async fn list_notifications_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(filter): Query<NotificationFilter>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    Ok(Json(
        state
            .notifications
            .list_notifications(auth.id, filter.unread_only, filter.since)
            .await?,
    ))
}

/// GET /api/notifications/unread-count
#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    responses((status = 200, description = "Unread notifications", body = CountResponse)),
    security(("bearer" = [])),
    tag = "notifications"
)]
pub async fn unread_count_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.notifications.count_unread_notifications(auth.id).await?;
    Ok(Json(CountResponse { count }))
}

/// PUT /api/notifications/{id}/read
#[utoipa::path(
    put,
    path = "/api/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "The notification, now read"),
        (status = 404, description = "No such notification of the caller")
    ),
    security(("bearer" = [])),
    tag = "notifications"
)]
pub async fn mark_read_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>, ApiError> {
    Ok(Json(
        state
            .notifications
            .mark_notification_read(id, auth.id)
            .await
            .map_err(not_found)?,
    ))
}

/// PUT /api/notifications/read-all
#[utoipa::path(
    put,
    path = "/api/notifications/read-all",
    responses((status = 200, description = "How many notifications changed", body = CountResponse)),
    security(("bearer" = [])),
    tag = "notifications"
)]
pub async fn mark_all_read_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state
        .notifications
        .mark_all_notifications_read(auth.id)
        .await?;
    Ok(Json(CountResponse { count }))
}

/// DELETE /api/notifications/{id}
#[utoipa::path(
    delete,
    path = "/api/notifications/{id}",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "No such notification of the caller")
    ),
    security(("bearer" = [])),
    tag = "notifications"
)]
pub async fn delete_notification_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .notifications
        .delete_notification(id, auth.id)
        .await
        .map_err(not_found)?;
    Ok(MessageResponse::new("Notification deleted"))
}

/// POST /api/notifications/broadcast - Announce something to an audience (admin)
#[utoipa::path(
    post,
    path = "/api/notifications/broadcast",
    request_body = BroadcastRequest,
    responses(
        (status = 200, description = "Number of recipients", body = BroadcastResponse),
        (status = 400, description = "Invalid audience"),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearer" = [])),
    tag = "notifications"
)]
pub async fn broadcast_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(req): ValidJson<BroadcastRequest>,
) -> Result<Json<BroadcastResponse>, ApiError> {
    auth.require_role(Role::Admin)?;
    let audience = req
        .audience
        .parse::<Audience>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    // 1. Resolve the audience to account ids
    let recipients = state.users.list_users(audience.role()).await?;

    // 2. One announcement per recipient, stored in a single batch
    let now = Utc::now();
    let title = req.title.trim();
    let message = req.message.trim();
    let batch: Vec<Notification> = recipients
        .iter()
        .map(|user| {
            Notification::new(
                user.id,
                NotificationKind::Announcement,
                title,
                message,
                None,
                now,
            )
        })
        .collect();
    let delivered = state.notifications.insert_notifications(&batch).await?;

    info!(
        "Broadcast \"{}\" delivered to {} recipients ({})",
        title, delivered, audience
    );
    Ok(Json(BroadcastResponse { delivered }))
}
