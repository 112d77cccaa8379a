//! services/api/src/web/advisors.rs
//!
//! The advisor marketplace: browsing advisors, advisor profiles and the
//! connection requests that pair a client with one advisor.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use guroosh_core::{
    domain::AdvisorProfilePatch, workflow, Availability, ConnectionRequest, ConnectionStatus,
    Notification, NotificationKind, PortError, Role, User,
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
pub struct AdvisorFilter {
    /// Case-insensitive match against any specialization.
    pub specialization: Option<String>,
    /// `Available`, `Busy` or `Unavailable`.
    pub availability: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct ConnectionFilter {
    /// `pending`, `accepted` or `rejected`.
    pub status: Option<String>,
}

#[derive(Deserialize, Validate, ToSchema)]
pub struct ConnectRequest {
    #[validate(length(max = 1000, message = "Message is too long"))]
    pub message: Option<String>,
}

#[derive(Deserialize, Validate, ToSchema)]
pub struct RespondRequest {
    pub status: String,
}

//=========================================================================================
// Helpers
//=========================================================================================

async fn load_advisor(state: &AppState, advisor_id: Uuid) -> Result<User, ApiError> {
    let not_found = || ApiError::NotFound("Advisor not found".to_string());
    let user = state.users.get_user(advisor_id).await.map_err(|e| match e {
        PortError::NotFound(_) => not_found(),
        other => ApiError::Port(other),
    })?;
    if user.is_advisor() {
        Ok(user)
    } else {
        Err(not_found())
    }
}

//=========================================================================================
// Advisors
//=========================================================================================

/// GET /api/advisors - Browse advisors
#[utoipa::path(
    get,
    path = "/api/advisors",
    params(AdvisorFilter),
    responses((status = 200, description = "Matching advisors")),
    security(("bearer" = [])),
    tag = "advisors"
)]
pub async fn list_advisors_handler(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<AdvisorFilter>,
) -> Result<Json<Vec<User>>, ApiError> {
    let availability = parse_filter::<Availability>(filter.availability.as_deref())?;
    let specialization = filter.specialization.unwrap_or_default();

    let advisors = state
        .users
        .list_users(Some(Role::Advisor))
        .await?
        .into_iter()
        .filter(|advisor| match &advisor.advisor_profile {
            Some(profile) => {
                profile.specializes_in(&specialization)
                    && availability.map_or(true, |a| profile.availability == a)
            }
            None => specialization.trim().is_empty() && availability.is_none(),
        })
        .collect();
    Ok(Json(advisors))
}

/// GET /api/advisors/{id} - One advisor's public profile
#[utoipa::path(
    get,
    path = "/api/advisors/{id}",
    params(("id" = Uuid, Path, description = "Advisor id")),
    responses(
        (status = 200, description = "The advisor"),
        (status = 404, description = "No advisor with that id")
    ),
    security(("bearer" = [])),
    tag = "advisors"
)]
pub async fn get_advisor_handler(
    State(state): State<Arc<AppState>>,
    Path(advisor_id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(load_advisor(&state, advisor_id).await?))
}

/// PUT /api/advisors/profile - Update the caller's advisor profile
#[utoipa::path(
    put,
    path = "/api/advisors/profile",
    request_body(content_type = "application/json", description = "Advisor profile fields to change."),
    responses(
        (status = 200, description = "The updated advisor"),
        (status = 403, description = "Caller is not an advisor")
    ),
    security(("bearer" = [])),
    tag = "advisors"
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(patch): ValidJson<AdvisorProfilePatch>,
) -> Result<Json<User>, ApiError> {
    auth.require_role(Role::Advisor)?;
    let mut user = state.users.get_user(auth.id).await?;
    let mut profile = user.advisor_profile.take().unwrap_or_default();
    patch.apply(&mut profile);
    user.advisor_profile = Some(profile);
    user.updated_at = Utc::now();
    Ok(Json(state.users.update_user(&user).await?))
}

//=========================================================================================
// Connection Requests
//=========================================================================================

/// POST /api/advisors/{id}/connect - Ask an advisor to take the caller on
#[utoipa::path(
    post,
    path = "/api/advisors/{id}/connect",
    params(("id" = Uuid, Path, description = "Advisor id")),
    request_body = ConnectRequest,
    responses(
        (status = 201, description = "Connection request created"),
        (status = 400, description = "Request already exists or targets the caller"),
        (status = 404, description = "No advisor with that id")
    ),
    security(("bearer" = [])),
    tag = "advisors"
)]
pub async fn connect_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(advisor_id): Path<Uuid>,
    ValidJson(req): ValidJson<ConnectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let advisor = load_advisor(&state, advisor_id).await?;
    if advisor.id == auth.id {
        return Err(ApiError::BadRequest(
            "You cannot send a connection request to yourself".to_string(),
        ));
    }

    if let Some(existing) = state
        .advisory
        .find_connection_request(auth.id, advisor.id)
        .await?
    {
        return Err(ApiError::AlreadyRequested(existing.status));
    }

    let now = Utc::now();
    let requester = state.users.get_user(auth.id).await?;
    let request = match state
        .advisory
        .create_connection_request(&ConnectionRequest::new(auth.id, advisor.id, req.message, now))
        .await
    {
        Ok(request) => request,
        Err(e) => return Err(duplicate_request(&state, auth.id, advisor.id, e).await),
    };

    notify(
        &state,
        Notification::new(
            advisor.id,
            NotificationKind::Connection,
            "New connection request",
            format!("{} would like to connect with you", requester.name),
            Some("/advisor/requests".to_string()),
            now,
        ),
    )
    .await;

    Ok((StatusCode::CREATED, Json(request)))
}

/// A concurrent request for the same pair wins the unique index; report its status.
async fn duplicate_request(
    state: &AppState,
    user_id: Uuid,
    advisor_id: Uuid,
    err: PortError,
) -> ApiError {
    if !matches!(err, PortError::Conflict(_)) {
        return err.into();
    }
    match state.advisory.find_connection_request(user_id, advisor_id).await {
        Ok(Some(existing)) => ApiError::AlreadyRequested(existing.status),
        Ok(None) => err.into(),
        Err(lookup) => lookup.into(),
    }
}

/// GET /api/advisors/requests/incoming - Connection requests sent to the caller
#[utoipa::path(
    get,
    path = "/api/advisors/requests/incoming",
    params(ConnectionFilter),
    responses(
        (status = 200, description = "Incoming connection requests"),
        (status = 403, description = "Caller is not an advisor")
    ),
    security(("bearer" = [])),
    tag = "advisors"
)]
pub async fn incoming_requests_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(filter): Query<ConnectionFilter>,
) -> Result<Json<Vec<ConnectionRequest>>, ApiError> {
    auth.require_role(Role::Advisor)?;
    let status = parse_filter::<ConnectionStatus>(filter.status.as_deref())?;
    Ok(Json(
        state
            .advisory
            .list_connection_requests_for_advisor(auth.id, status)
            .await?,
    ))
}

/// GET /api/advisors/requests/outgoing - Connection requests the caller sent
#[utoipa::path(
    get,
    path = "/api/advisors/requests/outgoing",
    responses((status = 200, description = "Outgoing connection requests")),
    security(("bearer" = [])),
    tag = "advisors"
)]
pub async fn outgoing_requests_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<ConnectionRequest>>, ApiError> {
    Ok(Json(
        state
            .advisory
            .list_connection_requests_for_user(auth.id)
            .await?,
    ))
}

/// PUT /api/advisors/requests/{id} - Accept or reject a connection request
#[utoipa::path(
    put,
    path = "/api/advisors/requests/{id}",
    params(("id" = Uuid, Path, description = "Connection request id")),
    request_body = RespondRequest,
    responses(
        (status = 200, description = "The answered request"),
        (status = 400, description = "Invalid decision or request already processed"),
        (status = 403, description = "The request was sent to another advisor"),
        (status = 404, description = "No such request")
    ),
    security(("bearer" = [])),
    tag = "advisors"
)]
pub async fn respond_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(request_id): Path<Uuid>,
    ValidJson(req): ValidJson<RespondRequest>,
) -> Result<Json<ConnectionRequest>, ApiError> {
    let mut request = state
        .advisory
        .get_connection_request(request_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => ApiError::NotFound("Connection request not found".to_string()),
            other => ApiError::Port(other),
        })?;

    let decision = workflow::check_connection_response(&request, auth.id, &req.status)?;
    let now = Utc::now();
    request.status = decision;
    request.responded_at = Some(now);
    let request = state.advisory.update_connection_request(&request).await?;

    if decision == ConnectionStatus::Accepted {
        let mut client = state.users.get_user(request.user_id).await?;
        client.connected_advisor = Some(request.advisor_id);
        client.updated_at = now;
        state.users.update_user(&client).await?;
        info!("User {} connected to advisor {}", client.id, request.advisor_id);
    }

    let advisor = state.users.get_user(auth.id).await?;
    notify(
        &state,
        Notification::new(
            request.user_id,
            NotificationKind::Connection,
            format!("Connection request {}", decision),
            format!("{} has {} your connection request", advisor.name, decision),
            Some("/advisors".to_string()),
            now,
        ),
    )
    .await;

    Ok(Json(request))
}

//=========================================================================================
// The Client/Advisor Pairing
//=========================================================================================

/// GET /api/advisors/my/advisor - The advisor the caller is connected to
#[utoipa::path(
    get,
    path = "/api/advisors/my/advisor",
    responses(
        (status = 200, description = "The connected advisor"),
        (status = 404, description = "No advisor connected")
    ),
    security(("bearer" = [])),
    tag = "advisors"
)]
pub async fn my_advisor_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<User>, ApiError> {
    let user = state.users.get_user(auth.id).await?;
    let advisor_id = user
        .connected_advisor
        .ok_or_else(|| ApiError::NotFound("No advisor connected".to_string()))?;
    Ok(Json(load_advisor(&state, advisor_id).await?))
}

/// DELETE /api/advisors/my/advisor - Disconnect from the current advisor
#[utoipa::path(
    delete,
    path = "/api/advisors/my/advisor",
    responses((status = 200, description = "Disconnected", body = MessageResponse)),
    security(("bearer" = [])),
    tag = "advisors"
)]
pub async fn disconnect_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut user = state.users.get_user(auth.id).await?;
    if user.connected_advisor.take().is_none() {
        return Err(ApiError::NotFound("No advisor connected".to_string()));
    }
    user.updated_at = Utc::now();
    state.users.update_user(&user).await?;
    Ok(MessageResponse::new("Disconnected from advisor"))
}

/// GET /api/advisors/my/clients - Users connected to the calling advisor
#[utoipa::path(
    get,
    path = "/api/advisors/my/clients",
    responses(
        (status = 200, description = "Connected clients"),
        (status = 403, description = "Caller is not an advisor")
    ),
    security(("bearer" = [])),
    tag = "advisors"
)]
pub async fn my_clients_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<User>>, ApiError> {
    auth.require_role(Role::Advisor)?;
    Ok(Json(state.users.list_clients_of(auth.id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{adapters::MemoryStore, config::Config};
    use guroosh_core::AdvisoryStore;
    use std::collections::HashMap;

    fn state(store: Arc<MemoryStore>) -> AppState {
        let vars = HashMap::from([("DATABASE_URL", "memory://"), ("JWT_SECRET", "s3cret")]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        AppState::with_store(store, Arc::new(config))
    }

    #[tokio::test]
    async fn losing_a_connect_race_reports_the_existing_status() {
        let store = Arc::new(MemoryStore::new());
        let (client, advisor) = (Uuid::new_v4(), Uuid::new_v4());
        store
            .create_connection_request(&ConnectionRequest::new(client, advisor, None, Utc::now()))
            .await
            .unwrap();
        let state = state(store);

        let err = duplicate_request(
            &state,
            client,
            advisor,
            PortError::Conflict("Connection request already exists".to_string()),
        )
        .await;
        assert!(matches!(err, ApiError::AlreadyRequested(ConnectionStatus::Pending)));
    }

    #[tokio::test]
    async fn other_storage_errors_pass_through() {
        let state = state(Arc::new(MemoryStore::new()));
        let err = duplicate_request(
            &state,
            Uuid::new_v4(),
            Uuid::new_v4(),
            PortError::Unexpected("pool closed".to_string()),
        )
        .await;
        assert!(matches!(err, ApiError::Port(PortError::Unexpected(_))));
    }
}
