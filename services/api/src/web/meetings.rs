//! services/api/src/web/meetings.rs
//!
//! Meetings scheduled between the two participants of an advice request.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use guroosh_core::{
    domain::{MeetingPatch, NewMeeting},
    workflow, Meeting, MeetingStatus, Notification, NotificationKind, PortError, TransitionError,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::ApiError,
    web::{
        extract::ValidJson,
        middleware::AuthUser,
        notify,
        requests::{load_request, StatusChange},
        state::AppState,
        MessageResponse,
    },
};

async fn load_meeting(state: &AppState, meeting_id: Uuid, actor: Uuid) -> Result<Meeting, ApiError> {
    let meeting = state
        .advisory
        .get_meeting(meeting_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => ApiError::NotFound("Meeting not found".to_string()),
            other => ApiError::Port(other),
        })?;
    if !meeting.involves(actor) {
        return Err(TransitionError::NotParticipant.into());
    }
    Ok(meeting)
}

fn when(date_time: DateTime<Utc>) -> String {
    date_time.format("%Y-%m-%d %H:%M UTC").to_string()
}

async fn tell_counterpart(
    state: &AppState,
    meeting: &Meeting,
    actor: Uuid,
    title: &str,
    message: String,
) {
    notify(
        state,
        Notification::new(
            meeting.counterpart(actor),
            NotificationKind::Meeting,
            title,
            message,
            Some(format!("/requests/{}", meeting.request_id)),
            Utc::now(),
        ),
    )
    .await;
}

/// POST /api/meetings - Schedule a meeting on an open request
#[utoipa::path(
    post,
    path = "/api/meetings",
    request_body(content_type = "application/json", description = "`requestId`, `dateTime`, optional `durationMinutes`, `location` and `agenda`."),
    responses(
        (status = 201, description = "Meeting scheduled"),
        (status = 400, description = "Time in the past, bad duration or request not open"),
        (status = 403, description = "Caller is not a participant")
    ),
    security(("bearer" = [])),
    tag = "meetings"
)]
pub async fn schedule_meeting_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(draft): ValidJson<NewMeeting>,
) -> Result<impl IntoResponse, ApiError> {
    let request = load_request(&state, draft.request_id, auth.id).await?;
    workflow::ensure_open(&request)?;
    let now = Utc::now();
    workflow::check_meeting_time(draft.date_time, now)?;

    let meeting = state
        .advisory
        .create_meeting(&Meeting::new(&request, draft, now))
        .await?;

    tell_counterpart(
        &state,
        &meeting,
        auth.id,
        "Meeting scheduled",
        format!(
            "A meeting about \"{}\" was scheduled for {}",
            request.topic,
            when(meeting.date_time)
        ),
    )
    .await;

    Ok((StatusCode::CREATED, Json(meeting)))
}

/// GET /api/meetings - The caller's meetings, soonest first
#[utoipa::path(
    get,
    path = "/api/meetings",
    responses((status = 200, description = "Meetings the caller takes part in")),
    security(("bearer" = [])),
    tag = "meetings"
)]
pub async fn list_meetings_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Meeting>>, ApiError> {
    Ok(Json(state.advisory.list_meetings_for_user(auth.id).await?))
}

/// GET /api/meetings/request/{id}
#[utoipa::path(
    get,
    path = "/api/meetings/request/{id}",
    params(("id" = Uuid, Path, description = "Request id")),
    responses((status = 200, description = "Meetings of the request")),
    security(("bearer" = [])),
    tag = "meetings"
)]
pub async fn request_meetings_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<Vec<Meeting>>, ApiError> {
    let request = load_request(&state, request_id, auth.id).await?;
    Ok(Json(
        state
            .advisory
            .list_meetings_for_request(request.id)
            .await?,
    ))
}

/// PUT /api/meetings/{id} - Reschedule or edit a scheduled meeting
#[utoipa::path(
    put,
    path = "/api/meetings/{id}",
    params(("id" = Uuid, Path, description = "Meeting id")),
    request_body(content_type = "application/json", description = "Optional `dateTime`, `durationMinutes`, `location` and `agenda`."),
    responses(
        (status = 200, description = "The updated meeting"),
        (status = 400, description = "Meeting is no longer scheduled, the request is no longer open or the new time is in the past")
    ),
    security(("bearer" = [])),
    tag = "meetings"
)]
pub async fn update_meeting_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(meeting_id): Path<Uuid>,
    ValidJson(patch): ValidJson<MeetingPatch>,
) -> Result<Json<Meeting>, ApiError> {
    let mut meeting = load_meeting(&state, meeting_id, auth.id).await?;
    workflow::ensure_meeting_editable(&meeting, auth.id)?;
    let request = load_request(&state, meeting.request_id, auth.id).await?;
    workflow::ensure_open(&request)?;
    let now = Utc::now();
    let rescheduled = patch.date_time;
    if let Some(date_time) = rescheduled {
        workflow::check_meeting_time(date_time, now)?;
    }

    patch.apply(&mut meeting, now);
    let meeting = state.advisory.update_meeting(&meeting).await?;

    if rescheduled.is_some() {
        tell_counterpart(
            &state,
            &meeting,
            auth.id,
            "Meeting rescheduled",
            format!("A meeting was moved to {}", when(meeting.date_time)),
        )
        .await;
    }
    Ok(Json(meeting))
}

/// PUT /api/meetings/{id}/status - Complete or cancel a meeting
#[utoipa::path(
    put,
    path = "/api/meetings/{id}/status",
    params(("id" = Uuid, Path, description = "Meeting id")),
    request_body = StatusChange,
    responses(
        (status = 200, description = "The updated meeting"),
        (status = 400, description = "Transition not allowed")
    ),
    security(("bearer" = [])),
    tag = "meetings"
)]
pub async fn meeting_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(meeting_id): Path<Uuid>,
    ValidJson(change): ValidJson<StatusChange>,
) -> Result<Json<Meeting>, ApiError> {
    let next = change
        .status
        .parse::<MeetingStatus>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let mut meeting = load_meeting(&state, meeting_id, auth.id).await?;
    workflow::check_meeting_transition(&meeting, auth.id, next)?;

    meeting.status = next;
    meeting.updated_at = Utc::now();
    let meeting = state.advisory.update_meeting(&meeting).await?;

    tell_counterpart(
        &state,
        &meeting,
        auth.id,
        &format!("Meeting {}", next),
        format!("The meeting on {} was marked {}", when(meeting.date_time), next),
    )
    .await;
    Ok(Json(meeting))
}

/// DELETE /api/meetings/{id}
#[utoipa::path(
    delete,
    path = "/api/meetings/{id}",
    params(("id" = Uuid, Path, description = "Meeting id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Caller is not a participant")
    ),
    security(("bearer" = [])),
    tag = "meetings"
)]
pub async fn delete_meeting_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(meeting_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let meeting = load_meeting(&state, meeting_id, auth.id).await?;
    state.advisory.delete_meeting(meeting.id).await?;
    Ok(MessageResponse::new("Meeting deleted"))
}
