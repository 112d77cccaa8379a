//! services/api/src/web/rest.rs
//!
//! The health probe and the master definition for the OpenAPI specification.

use axum::Json;
use serde::Serialize;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi, ToSchema,
};

use crate::web::{
    admin, advisors, auth, investments, ledger, meetings, messages, notes, notifications,
    requests, settings, CountResponse, MessageResponse,
};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::register_handler,
        auth::login_handler,
        auth::verify_email_handler,
        auth::forgot_password_handler,
        auth::reset_password_handler,
        auth::me_handler,
        auth::update_me_handler,
        auth::become_advisor_handler,
        advisors::list_advisors_handler,
        advisors::get_advisor_handler,
        advisors::update_profile_handler,
        advisors::connect_handler,
        advisors::incoming_requests_handler,
        advisors::outgoing_requests_handler,
        advisors::respond_handler,
        advisors::my_advisor_handler,
        advisors::disconnect_handler,
        advisors::my_clients_handler,
        requests::create_request_handler,
        requests::list_requests_handler,
        requests::get_request_handler,
        requests::update_request_handler,
        requests::delete_request_handler,
        requests::accept_request_handler,
        requests::decline_request_handler,
        requests::request_status_handler,
        requests::draft_request_handler,
        messages::send_message_handler,
        messages::list_messages_handler,
        messages::mark_read_handler,
        messages::unread_count_handler,
        messages::edit_message_handler,
        messages::delete_message_handler,
        notes::create_note_handler,
        notes::list_notes_handler,
        notes::update_note_handler,
        notes::delete_note_handler,
        meetings::schedule_meeting_handler,
        meetings::list_meetings_handler,
        meetings::request_meetings_handler,
        meetings::update_meeting_handler,
        meetings::meeting_status_handler,
        meetings::delete_meeting_handler,
        ledger::budget_progress_handler,
        ledger::contribute_handler,
        ledger::overview_handler,
        investments::summary_handler,
        investments::zakat_handler,
        investments::trend_handler,
        investments::prices_handler,
        settings::get_settings_handler,
        settings::update_settings_handler,
        settings::reset_settings_handler,
        settings::change_password_handler,
        notifications::list_notifications_handler,
        notifications::unread_count_handler,
        notifications::mark_read_handler,
        notifications::mark_all_read_handler,
        notifications::delete_notification_handler,
        notifications::broadcast_handler,
        admin::list_users_handler,
    ),
    components(
        schemas(
            HealthResponse,
            MessageResponse,
            CountResponse,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::VerifyEmailRequest,
            auth::ForgotPasswordRequest,
            auth::ResetPasswordRequest,
            auth::AuthResponse,
            advisors::ConnectRequest,
            advisors::RespondRequest,
            requests::StatusChange,
            requests::DraftRequest,
            messages::SendMessageRequest,
            messages::EditMessageRequest,
            notes::CreateNoteRequest,
            notes::UpdateNoteRequest,
            settings::ChangePasswordRequest,
            notifications::BroadcastRequest,
            notifications::BroadcastResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Guroosh API", description = "Personal finance and financial advisory endpoints.")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` scheme the protected paths refer to.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

//=========================================================================================
// Health
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "The service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_protected_routes_with_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/investments/zakat"));
        assert!(doc.paths.paths.contains_key("/api/advisors/{id}/connect"));
        let components = doc.components.expect("components are generated");
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
