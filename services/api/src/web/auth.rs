//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: registration, login, e-mail verification, password
//! reset, the caller's own profile and the switch to an advisor account.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::Utc;
use guroosh_core::{
    domain::{AdvisorProfilePatch, NewUser, UserPatch},
    not_blank, AdvisorProfile, PortError, Role, User,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::ApiError,
    web::{extract::ValidJson, middleware::AuthUser, state::AppState, token, MessageResponse},
};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(
        length(max = 100, message = "Name must be at most 100 characters"),
        custom(function = "not_blank", message = "Name is required")
    )]
    pub name: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[serde(default)]
    pub is_advisor: bool,
}

#[derive(Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Deserialize, Validate, ToSchema)]
pub struct VerifyEmailRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

#[derive(Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
}

#[derive(Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    #[schema(value_type = Object)]
    pub user: User,
}

//=========================================================================================
// Password Hashing
//=========================================================================================

pub(crate) fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })
}

pub(crate) fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Stored password hash is malformed".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn one_time_token() -> String {
    Uuid::new_v4().simple().to_string()
}

fn auth_response(state: &AppState, user: User) -> Result<AuthResponse, ApiError> {
    let token = token::issue_token(
        &state.config.jwt_secret,
        state.config.jwt_expiry,
        user.id,
        user.role,
        Utc::now(),
    )?;
    Ok(AuthResponse { token, user })
}

/// Creates the configured administrator account unless its e-mail is already taken.
pub async fn seed_admin(state: &AppState) -> Result<(), ApiError> {
    let Some(seed) = state.config.admin.as_ref() else {
        return Ok(());
    };
    let email = normalize_email(&seed.email);
    match state.users.get_credentials_by_email(&email).await {
        Ok(_) => {
            info!("Admin account {} already exists", email);
            return Ok(());
        }
        Err(PortError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    let mut admin = state
        .users
        .create_user(NewUser {
            name: seed.name.clone(),
            email: email.clone(),
            role: Role::Admin,
            advisor_profile: None,
            password_hash: hash_password(&seed.password)?,
            verification_token: None,
        })
        .await?;
    admin.email_verified = true;
    state.users.update_user(&admin).await?;
    info!("Created admin account {}", email);
    Ok(())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/register - Create a new account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid request or e-mail already registered")
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    let email = normalize_email(&req.email);

    // 1. Hash the password
    let password_hash = hash_password(&req.password)?;

    // 2. Create the account; admins are only ever seeded
    let verification_token = one_time_token();
    let (role, advisor_profile) = if req.is_advisor {
        (Role::Advisor, Some(AdvisorProfile::default()))
    } else {
        (Role::User, None)
    };
    let user = state
        .users
        .create_user(NewUser {
            name,
            email: email.clone(),
            role,
            advisor_profile,
            password_hash,
            verification_token: Some(verification_token.clone()),
        })
        .await
        .map_err(|e| match e {
            PortError::Conflict(_) => ApiError::BadRequest("Email already registered".to_string()),
            other => ApiError::Port(other),
        })?;
    info!("Verification token for {}: {}", email, verification_token);

    // 3. Sign the caller in
    Ok((StatusCode::CREATED, Json(auth_response(&state, user)?)))
}

/// POST /api/auth/login - Sign in with e-mail and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let credentials = state
        .users
        .get_credentials_by_email(&normalize_email(&req.email))
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => invalid(),
            other => ApiError::Port(other),
        })?;

    if !verify_password(&req.password, &credentials.password_hash)? {
        return Err(invalid());
    }

    let user = state.users.get_user(credentials.user_id).await?;
    Ok(Json(auth_response(&state, user)?))
}

/// POST /api/auth/verify-email - Confirm ownership of the e-mail address
#[utoipa::path(
    post,
    path = "/api/auth/verify-email",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "E-mail verified", body = MessageResponse),
        (status = 400, description = "Unknown token")
    ),
    tag = "auth"
)]
pub async fn verify_email_handler(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user_id = state
        .users
        .verify_email(req.token.trim())
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => {
                ApiError::BadRequest("Invalid or expired verification token".to_string())
            }
            other => ApiError::Port(other),
        })?;
    info!("E-mail verified for user {}", user_id);
    Ok(MessageResponse::new("Email verified successfully"))
}

/// POST /api/auth/forgot-password - Request a password reset token
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses((status = 200, description = "Reset requested", body = MessageResponse)),
    tag = "auth"
)]
pub async fn forgot_password_handler(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = normalize_email(&req.email);
    match state.users.get_credentials_by_email(&email).await {
        Ok(credentials) => {
            let reset_token = one_time_token();
            let expires_at = Utc::now() + state.config.reset_token_ttl;
            state
                .users
                .set_reset_token(credentials.user_id, &reset_token, expires_at)
                .await?;
            info!("Password reset token for {}: {}", email, reset_token);
        }
        // Unknown addresses get the same answer.
        Err(PortError::NotFound(_)) => {}
        Err(other) => return Err(other.into()),
    }
    Ok(MessageResponse::new(
        "If that email is registered, a password reset link has been sent",
    ))
}

/// POST /api/auth/reset-password - Set a new password with a reset token
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Unknown or expired token")
    ),
    tag = "auth"
)]
pub async fn reset_password_handler(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user_id = state
        .users
        .consume_reset_token(req.token.trim(), Utc::now())
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => {
                ApiError::BadRequest("Invalid or expired reset token".to_string())
            }
            other => ApiError::Port(other),
        })?;
    let password_hash = hash_password(&req.password)?;
    state.users.update_password(user_id, &password_hash).await?;
    Ok(MessageResponse::new("Password has been reset"))
}

/// GET /api/auth/me - The caller's account
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "The authenticated user"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.get_user(auth.id).await?))
}

/// PUT /api/auth/me - Update name and phone
#[utoipa::path(
    put,
    path = "/api/auth/me",
    request_body(content_type = "application/json", description = "Optional `name` and `phone`."),
    responses((status = 200, description = "The updated user")),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn update_me_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(patch): ValidJson<UserPatch>,
) -> Result<Json<User>, ApiError> {
    let mut user = state.users.get_user(auth.id).await?;
    patch.apply(&mut user, Utc::now());
    Ok(Json(state.users.update_user(&user).await?))
}

/// POST /api/auth/become-advisor - Turn the account into an advisor account
#[utoipa::path(
    post,
    path = "/api/auth/become-advisor",
    request_body(content_type = "application/json", description = "Optional advisor profile fields."),
    responses(
        (status = 200, description = "The account with its advisor profile"),
        (status = 400, description = "Administrators cannot become advisors")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn become_advisor_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(patch): ValidJson<AdvisorProfilePatch>,
) -> Result<Json<User>, ApiError> {
    let mut user = state.users.get_user(auth.id).await?;
    if user.is_admin() {
        return Err(ApiError::BadRequest(
            "Administrators cannot become advisors".to_string(),
        ));
    }
    user.become_advisor(patch, Utc::now());
    let user = state.users.update_user(&user).await?;
    info!("User {} is now an advisor", user.id);
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hashes_verify() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[test]
    fn malformed_hashes_are_internal_errors() {
        assert!(matches!(
            verify_password("x", "not-a-phc-string"),
            Err(ApiError::Internal(_))
        ));
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Sara@Example.COM "), "sara@example.com");
    }
}
