//! services/api/src/web/requests.rs
//!
//! Advice requests and their lifecycle. Every status change goes through
//! [`guroosh_core::workflow`] and notifies the other participant.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use guroosh_core::{
    domain::{AdviceRequestPatch, NewAdviceRequest},
    workflow, AdviceRequest, Notification, NotificationKind, Participant, PortError,
    RequestStatus, TransitionError,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::ApiError,
    web::{
        extract::ValidJson, middleware::AuthUser, notify, parse_filter, state::AppState,
        MessageResponse,
    },
};

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize, IntoParams)]
pub struct RequestFilter {
    /// Only requests in this status, e.g. `In Progress`.
    pub status: Option<String>,
    /// `client` or `advisor`: only requests where the caller plays that part.
    #[serde(rename = "as")]
    pub side: Option<String>,
}

#[derive(Deserialize, Validate, ToSchema)]
pub struct StatusChange {
    pub status: String,
}

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DraftRequest {
    #[validate(length(max = 10000, message = "Draft response is too long"))]
    pub draft_response: String,
}

//=========================================================================================
// Shared Lookups
//=========================================================================================

/// Loads a request the caller takes part in and has not deleted from their side.
pub(crate) async fn load_request(
    state: &AppState,
    request_id: Uuid,
    actor: Uuid,
) -> Result<AdviceRequest, ApiError> {
    let not_found = || ApiError::NotFound("Request not found".to_string());
    let request = state
        .advisory
        .get_request(request_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => not_found(),
            other => ApiError::Port(other),
        })?;
    if request.participant(actor).is_none() {
        return Err(TransitionError::NotParticipant.into());
    }
    if request.is_hidden_from(actor) {
        return Err(not_found());
    }
    Ok(request)
}

fn request_link(request_id: Uuid) -> Option<String> {
    Some(format!("/requests/{}", request_id))
}

/// Moves a request to `next` on behalf of `actor` and tells the other side.
async fn transition(
    state: &AppState,
    actor: Uuid,
    request_id: Uuid,
    next: RequestStatus,
) -> Result<AdviceRequest, ApiError> {
    let mut request = load_request(state, request_id, actor).await?;
    workflow::check_request_transition(&request, actor, next)?;

    let now = Utc::now();
    let from = request.status;
    request.status = next;
    request.updated_at = now;
    let request = state.advisory.update_request(&request).await?;
    info!("Request {} moved from {} to {}", request.id, from, next);

    notify(
        state,
        Notification::new(
            request.counterpart(actor),
            NotificationKind::Request,
            format!("Request {}", next),
            format!("\"{}\" is now {}", request.topic, next),
            request_link(request.id),
            now,
        ),
    )
    .await;
    Ok(request)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/requests - Ask an advisor for advice
#[utoipa::path(
    post,
    path = "/api/requests",
    request_body(content_type = "application/json", description = "`advisorId`, `topic`, `description` and optional `budget`."),
    responses(
        (status = 201, description = "Request created"),
        (status = 404, description = "No advisor with that id")
    ),
    security(("bearer" = [])),
    tag = "requests"
)]
pub async fn create_request_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(draft): ValidJson<NewAdviceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let not_found = || ApiError::NotFound("Advisor not found".to_string());
    let advisor = state
        .users
        .get_user(draft.advisor_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => not_found(),
            other => ApiError::Port(other),
        })?;
    if !advisor.is_advisor() {
        return Err(not_found());
    }
    if advisor.id == auth.id {
        return Err(ApiError::BadRequest(
            "You cannot send an advice request to yourself".to_string(),
        ));
    }

    let now = Utc::now();
    let request = state
        .advisory
        .create_request(&AdviceRequest::new(auth.id, draft, now))
        .await?;

    notify(
        &state,
        Notification::new(
            advisor.id,
            NotificationKind::Request,
            "New advice request",
            format!("You received a new request: \"{}\"", request.topic),
            request_link(request.id),
            now,
        ),
    )
    .await;

    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /api/requests - The caller's requests, newest first
#[utoipa::path(
    get,
    path = "/api/requests",
    params(RequestFilter),
    responses((status = 200, description = "Requests the caller takes part in")),
    security(("bearer" = [])),
    tag = "requests"
)]
pub async fn list_requests_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(filter): Query<RequestFilter>,
) -> Result<Json<Vec<AdviceRequest>>, ApiError> {
    let status = parse_filter::<RequestStatus>(filter.status.as_deref())?;
    let side = match filter.side.as_deref() {
        None | Some("") => None,
        Some("client") => Some(Participant::Client),
        Some("advisor") => Some(Participant::Advisor),
        Some(other) => {
            return Err(ApiError::BadRequest(format!(
                "'{}' is not a valid side, expected 'client' or 'advisor'",
                other
            )))
        }
    };

    let requests = state
        .advisory
        .list_requests_for(auth.id)
        .await?
        .into_iter()
        .filter(|r| !r.is_hidden_from(auth.id))
        .filter(|r| status.map_or(true, |s| r.status == s))
        .filter(|r| side.map_or(true, |s| r.participant(auth.id) == Some(s)))
        .collect();
    Ok(Json(requests))
}

/// GET /api/requests/{id}
#[utoipa::path(
    get,
    path = "/api/requests/{id}",
    params(("id" = Uuid, Path, description = "Request id")),
    responses(
        (status = 200, description = "The request"),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "No such request")
    ),
    security(("bearer" = [])),
    tag = "requests"
)]
pub async fn get_request_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<AdviceRequest>, ApiError> {
    Ok(Json(load_request(&state, request_id, auth.id).await?))
}

/// PUT /api/requests/{id} - Edit a pending request
#[utoipa::path(
    put,
    path = "/api/requests/{id}",
    params(("id" = Uuid, Path, description = "Request id")),
    request_body(content_type = "application/json", description = "Optional `topic`, `description` and `budget`."),
    responses(
        (status = 200, description = "The updated request"),
        (status = 400, description = "The advisor already answered"),
        (status = 403, description = "Caller is not the client")
    ),
    security(("bearer" = [])),
    tag = "requests"
)]
pub async fn update_request_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(request_id): Path<Uuid>,
    ValidJson(patch): ValidJson<AdviceRequestPatch>,
) -> Result<Json<AdviceRequest>, ApiError> {
    let mut request = load_request(&state, request_id, auth.id).await?;
    workflow::ensure_client_editable(&request, auth.id)?;
    patch.apply(&mut request, Utc::now());
    Ok(Json(state.advisory.update_request(&request).await?))
}

/// DELETE /api/requests/{id} - Remove the request from the caller's view
#[utoipa::path(
    delete,
    path = "/api/requests/{id}",
    params(("id" = Uuid, Path, description = "Request id")),
    responses((status = 200, description = "Deleted", body = MessageResponse)),
    security(("bearer" = [])),
    tag = "requests"
)]
pub async fn delete_request_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut request = load_request(&state, request_id, auth.id).await?;
    let side = request
        .participant(auth.id)
        .ok_or(TransitionError::NotParticipant)?;

    if request.soft_delete(side, Utc::now()) {
        state.advisory.delete_request(request.id).await?;
        info!("Request {} deleted by both participants", request.id);
    } else {
        state.advisory.update_request(&request).await?;
    }
    Ok(MessageResponse::new("Request deleted"))
}

/// PUT /api/requests/{id}/accept
#[utoipa::path(
    put,
    path = "/api/requests/{id}/accept",
    params(("id" = Uuid, Path, description = "Request id")),
    responses(
        (status = 200, description = "The accepted request"),
        (status = 400, description = "Request is not pending"),
        (status = 403, description = "Caller is not the targeted advisor")
    ),
    security(("bearer" = [])),
    tag = "requests"
)]
pub async fn accept_request_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<AdviceRequest>, ApiError> {
    Ok(Json(
        transition(&state, auth.id, request_id, RequestStatus::Accepted).await?,
    ))
}

/// PUT /api/requests/{id}/decline
#[utoipa::path(
    put,
    path = "/api/requests/{id}/decline",
    params(("id" = Uuid, Path, description = "Request id")),
    responses(
        (status = 200, description = "The declined request"),
        (status = 400, description = "Request is not pending"),
        (status = 403, description = "Caller is not the targeted advisor")
    ),
    security(("bearer" = [])),
    tag = "requests"
)]
pub async fn decline_request_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<AdviceRequest>, ApiError> {
    Ok(Json(
        transition(&state, auth.id, request_id, RequestStatus::Declined).await?,
    ))
}

/// PUT /api/requests/{id}/status - Any other participant-driven transition
#[utoipa::path(
    put,
    path = "/api/requests/{id}/status",
    params(("id" = Uuid, Path, description = "Request id")),
    request_body = StatusChange,
    responses(
        (status = 200, description = "The updated request"),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "Caller may not make this transition")
    ),
    security(("bearer" = [])),
    tag = "requests"
)]
pub async fn request_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(request_id): Path<Uuid>,
    ValidJson(change): ValidJson<StatusChange>,
) -> Result<Json<AdviceRequest>, ApiError> {
    let next = change
        .status
        .parse::<RequestStatus>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(transition(&state, auth.id, request_id, next).await?))
}

/// PUT /api/requests/{id}/draft - Save the advisor's unsent answer
#[utoipa::path(
    put,
    path = "/api/requests/{id}/draft",
    params(("id" = Uuid, Path, description = "Request id")),
    request_body = DraftRequest,
    responses(
        (status = 200, description = "The request with its draft"),
        (status = 403, description = "Caller is not the advisor")
    ),
    security(("bearer" = [])),
    tag = "requests"
)]
pub async fn draft_request_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(request_id): Path<Uuid>,
    ValidJson(req): ValidJson<DraftRequest>,
) -> Result<Json<AdviceRequest>, ApiError> {
    let mut request = load_request(&state, request_id, auth.id).await?;
    if request.participant(auth.id) != Some(Participant::Advisor) {
        return Err(TransitionError::NotAdvisor.into());
    }
    if request.status.is_terminal() {
        return Err(TransitionError::AlreadyProcessed(request.status.to_string()).into());
    }

    let draft = req.draft_response.trim().to_string();
    request.draft_response = (!draft.is_empty()).then_some(draft);
    request.updated_at = Utc::now();
    Ok(Json(state.advisory.update_request(&request).await?))
}
