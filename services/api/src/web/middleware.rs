//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use guroosh_core::{PortError, Role};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::ApiError,
    web::{state::AppState, token},
};

/// The caller of a protected route, as established by [`require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn require_role(&self, role: Role) -> Result<(), ApiError> {
        if self.role == role {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "This action requires the {} role",
                role
            )))
        }
    }
}

/// Middleware that validates the bearer token and extracts the caller.
///
/// The role is read from the stored account rather than from the token, so a
/// user who just became an advisor does not need a fresh token.
/// If valid, inserts an [`AuthUser`] into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract the bearer token
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string()))?;

    // 2. Validate signature and expiry
    let claims = token::decode_token(&state.config.jwt_secret, token)?;

    // 3. Load the account the token was issued for
    let user = state.users.get_user(claims.sub).await.map_err(|e| match e {
        PortError::NotFound(_) => ApiError::Unauthorized("User not found".to_string()),
        other => ApiError::Port(other),
    })?;

    // 4. Insert the caller into request extensions
    req.extensions_mut().insert(AuthUser {
        id: user.id,
        role: user.role,
    });

    // 5. Continue to the handler
    Ok(next.run(req).await)
}
