//! services/api/src/web/settings.rs
//!
//! Per-user preferences and password changes.

use axum::{extract::State, Extension, Json};
use chrono::Utc;
use guroosh_core::{domain::SettingsPatch, UserSettings};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::ApiError,
    web::{
        auth::{hash_password, verify_password},
        extract::ValidJson,
        middleware::AuthUser,
        state::AppState,
        MessageResponse,
    },
};

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 6, message = "New password must be at least 6 characters"))]
    pub new_password: String,
}

async fn current_settings(state: &AppState, auth: &AuthUser) -> Result<UserSettings, ApiError> {
    Ok(state
        .users
        .get_settings(auth.id)
        .await?
        .unwrap_or_else(|| UserSettings::defaults(auth.id, Utc::now())))
}

/// GET /api/settings - The caller's preferences, defaults when never saved
#[utoipa::path(
    get,
    path = "/api/settings",
    responses((status = 200, description = "The caller's settings")),
    security(("bearer" = [])),
    tag = "settings"
)]
pub async fn get_settings_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserSettings>, ApiError> {
    Ok(Json(current_settings(&state, &auth).await?))
}

/// PUT /api/settings
#[utoipa::path(
    put,
    path = "/api/settings",
    request_body(content_type = "application/json", description = "Any of `currency`, `language`, `theme`, `emailNotifications`, `pushNotifications`, `budgetAlerts`."),
    responses(
        (status = 200, description = "The updated settings"),
        (status = 400, description = "Invalid value")
    ),
    security(("bearer" = [])),
    tag = "settings"
)]
pub async fn update_settings_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(patch): ValidJson<SettingsPatch>,
) -> Result<Json<UserSettings>, ApiError> {
    if let Some(currency) = &patch.currency {
        if !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ApiError::BadRequest(
                "Currency must be a 3-letter code".to_string(),
            ));
        }
    }
    let mut settings = current_settings(&state, &auth).await?;
    patch.apply(&mut settings, Utc::now());
    Ok(Json(state.users.save_settings(&settings).await?))
}

/// POST /api/settings/reset - Restore the defaults
#[utoipa::path(
    post,
    path = "/api/settings/reset",
    responses((status = 200, description = "The default settings")),
    security(("bearer" = [])),
    tag = "settings"
)]
pub async fn reset_settings_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserSettings>, ApiError> {
    let defaults = UserSettings::defaults(auth.id, Utc::now());
    Ok(Json(state.users.save_settings(&defaults).await?))
}

/// POST /api/settings/password - Change the password
#[utoipa::path(
    post,
    path = "/api/settings/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Current password is incorrect")
    ),
    security(("bearer" = [])),
    tag = "settings"
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(req): ValidJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let credentials = state.users.get_credentials(auth.id).await?;
    if !verify_password(&req.current_password, &credentials.password_hash)? {
        return Err(ApiError::BadRequest(
            "Current password is incorrect".to_string(),
        ));
    }
    let password_hash = hash_password(&req.new_password)?;
    state.users.update_password(auth.id, &password_hash).await?;
    info!("Password changed for user {}", auth.id);
    Ok(MessageResponse::new("Password updated"))
}
