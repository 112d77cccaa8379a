//! services/api/src/web/admin.rs

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use guroosh_core::{Role, User};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

use crate::{
    error::ApiError,
    web::{middleware::AuthUser, parse_filter, state::AppState},
};

#[derive(Deserialize, IntoParams)]
pub struct UserFilter {
    /// `user`, `advisor` or `admin`.
    pub role: Option<String>,
}

/// GET /api/admin/users - Every account, optionally of one role
#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(UserFilter),
    responses(
        (status = 200, description = "Accounts"),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(filter): Query<UserFilter>,
) -> Result<Json<Vec<User>>, ApiError> {
    auth.require_role(Role::Admin)?;
    let role = parse_filter::<Role>(filter.role.as_deref())?;
    Ok(Json(state.users.list_users(role).await?))
}
