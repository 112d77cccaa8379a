//! services/api/src/web/notes.rs
//!
//! Private notes a participant keeps on an advice request.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use guroosh_core::{not_blank, Note, PortError};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::ApiError,
    web::{
        extract::ValidJson, middleware::AuthUser, requests::load_request, state::AppState,
        MessageResponse,
    },
};

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub request_id: Uuid,
    #[validate(
        length(max = 10000, message = "Note must be between 1 and 10000 characters"),
        custom(function = "not_blank", message = "Note cannot be empty")
    )]
    pub content: String,
}

#[derive(Deserialize, Validate, ToSchema)]
pub struct UpdateNoteRequest {
    #[validate(
        length(max = 10000, message = "Note must be between 1 and 10000 characters"),
        custom(function = "not_blank", message = "Note cannot be empty")
    )]
    pub content: String,
}

async fn load_own_note(state: &AppState, note_id: Uuid, actor: Uuid) -> Result<Note, ApiError> {
    let note = state.advisory.get_note(note_id).await.map_err(|e| match e {
        PortError::NotFound(_) => ApiError::NotFound("Note not found".to_string()),
        other => ApiError::Port(other),
    })?;
    if note.author_id != actor {
        return Err(ApiError::Forbidden(
            "Only the author can change this note".to_string(),
        ));
    }
    Ok(note)
}

/// POST /api/notes
#[utoipa::path(
    post,
    path = "/api/notes",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created"),
        (status = 403, description = "Caller is not a participant")
    ),
    security(("bearer" = [])),
    tag = "notes"
)]
pub async fn create_note_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(req): ValidJson<CreateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let request = load_request(&state, req.request_id, auth.id).await?;
    let note = state
        .advisory
        .create_note(&Note::new(request.id, auth.id, &req.content, Utc::now()))
        .await?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// GET /api/notes/request/{id} - The caller's notes on a request
#[utoipa::path(
    get,
    path = "/api/notes/request/{id}",
    params(("id" = Uuid, Path, description = "Request id")),
    responses((status = 200, description = "The caller's notes")),
    security(("bearer" = [])),
    tag = "notes"
)]
pub async fn list_notes_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let request = load_request(&state, request_id, auth.id).await?;
    Ok(Json(state.advisory.list_notes(request.id, auth.id).await?))
}

/// PUT /api/notes/{id}
#[utoipa::path(
    put,
    path = "/api/notes/{id}",
    params(("id" = Uuid, Path, description = "Note id")),
    request_body = UpdateNoteRequest,
    responses(
        (status = 200, description = "The updated note"),
        (status = 403, description = "Caller is not the author")
    ),
    security(("bearer" = [])),
    tag = "notes"
)]
pub async fn update_note_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(note_id): Path<Uuid>,
    ValidJson(req): ValidJson<UpdateNoteRequest>,
) -> Result<Json<Note>, ApiError> {
    let mut note = load_own_note(&state, note_id, auth.id).await?;
    note.content = req.content.trim().to_string();
    note.updated_at = Utc::now();
    Ok(Json(state.advisory.update_note(&note).await?))
}

/// DELETE /api/notes/{id}
#[utoipa::path(
    delete,
    path = "/api/notes/{id}",
    params(("id" = Uuid, Path, description = "Note id")),
    responses((status = 200, description = "Deleted", body = MessageResponse)),
    security(("bearer" = [])),
    tag = "notes"
)]
pub async fn delete_note_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(note_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let note = load_own_note(&state, note_id, auth.id).await?;
    state.advisory.delete_note(note.id).await?;
    Ok(MessageResponse::new("Note deleted"))
}
