//! services/api/src/web/mod.rs
//!
//! The HTTP surface of the service: route handlers grouped by resource, the
//! authentication middleware and the router that ties them together.

pub mod admin;
pub mod advisors;
pub mod auth;
pub mod extract;
pub mod investments;
pub mod ledger;
pub mod meetings;
pub mod messages;
pub mod middleware;
pub mod notes;
pub mod notifications;
pub mod requests;
pub mod rest;
pub mod settings;
pub mod state;
pub mod token;

pub use middleware::require_auth;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use guroosh_core::{Budget, Category, Expense, Goal, Income, Investment, Notification};
use serde::Serialize;
use std::{fmt::Display, str::FromStr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;
use utoipa::ToSchema;

use crate::error::ApiError;
use state::AppState;

//=========================================================================================
// Shared Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Serialize, ToSchema)]
pub struct CountResponse {
    pub count: u64,
}

//=========================================================================================
// Shared Helpers
//=========================================================================================

/// Stores a notification without failing the request that triggered it.
pub(crate) async fn notify(state: &AppState, notification: Notification) {
    if let Err(e) = state
        .notifications
        .insert_notifications(std::slice::from_ref(&notification))
        .await
    {
        warn!(
            "Failed to store {} notification for {}: {}",
            notification.kind, notification.user_id, e
        );
    }
}

/// Parses an optional query-string filter; blank means no filter.
pub(crate) fn parse_filter<T>(value: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: FromStr,
    T::Err: Display,
{
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ApiError::BadRequest(e.to_string())),
    }
}

//=========================================================================================
// Router
//=========================================================================================

/// Registers the five CRUD routes of one ledger entry kind under `base`.
fn ledger_routes<T: guroosh_core::LedgerEntry>(
    router: Router<Arc<AppState>>,
    base: &str,
) -> Router<Arc<AppState>> {
    router
        .route(
            base,
            get(ledger::list_entries::<T>).post(ledger::create_entry::<T>),
        )
        .route(
            &format!("{}/{{id}}", base),
            get(ledger::get_entry::<T>)
                .put(ledger::update_entry::<T>)
                .delete(ledger::delete_entry::<T>),
        )
}

/// Builds the complete application router for the given state.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(app_state.config.cors_origin.clone())
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/health", get(rest::health_handler))
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/verify-email", post(auth::verify_email_handler))
        .route("/api/auth/forgot-password", post(auth::forgot_password_handler))
        .route("/api/auth/reset-password", post(auth::reset_password_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        // --- Account ---
        .route(
            "/api/auth/me",
            get(auth::me_handler).put(auth::update_me_handler),
        )
        .route(
            "/api/auth/profile",
            get(auth::me_handler).put(auth::update_me_handler),
        )
        .route("/api/auth/become-advisor", post(auth::become_advisor_handler))
        // --- Advisors & connection requests ---
        .route("/api/advisors", get(advisors::list_advisors_handler))
        .route("/api/advisors/profile", put(advisors::update_profile_handler))
        .route(
            "/api/advisors/requests/incoming",
            get(advisors::incoming_requests_handler),
        )
        .route(
            "/api/advisors/requests/outgoing",
            get(advisors::outgoing_requests_handler),
        )
        .route("/api/advisors/requests/{id}", put(advisors::respond_handler))
        .route(
            "/api/advisors/my/advisor",
            get(advisors::my_advisor_handler).delete(advisors::disconnect_handler),
        )
        .route("/api/advisors/my/clients", get(advisors::my_clients_handler))
        .route("/api/advisors/{id}", get(advisors::get_advisor_handler))
        .route("/api/advisors/{id}/connect", post(advisors::connect_handler))
        // --- Advice requests ---
        .route(
            "/api/requests",
            get(requests::list_requests_handler).post(requests::create_request_handler),
        )
        .route(
            "/api/requests/{id}",
            get(requests::get_request_handler)
                .put(requests::update_request_handler)
                .delete(requests::delete_request_handler),
        )
        .route("/api/requests/{id}/accept", put(requests::accept_request_handler))
        .route("/api/requests/{id}/decline", put(requests::decline_request_handler))
        .route("/api/requests/{id}/status", put(requests::request_status_handler))
        .route("/api/requests/{id}/draft", put(requests::draft_request_handler))
        // --- Messages ---
        .route("/api/messages", post(messages::send_message_handler))
        .route("/api/messages/unread-count", get(messages::unread_count_handler))
        .route("/api/messages/request/{id}", get(messages::list_messages_handler))
        .route("/api/messages/request/{id}/read", put(messages::mark_read_handler))
        .route(
            "/api/messages/{id}",
            put(messages::edit_message_handler).delete(messages::delete_message_handler),
        )
        // --- Notes ---
        .route("/api/notes", post(notes::create_note_handler))
        .route("/api/notes/request/{id}", get(notes::list_notes_handler))
        .route(
            "/api/notes/{id}",
            put(notes::update_note_handler).delete(notes::delete_note_handler),
        )
        // --- Meetings ---
        .route(
            "/api/meetings",
            get(meetings::list_meetings_handler).post(meetings::schedule_meeting_handler),
        )
        .route("/api/meetings/request/{id}", get(meetings::request_meetings_handler))
        .route(
            "/api/meetings/{id}",
            put(meetings::update_meeting_handler).delete(meetings::delete_meeting_handler),
        )
        .route("/api/meetings/{id}/status", put(meetings::meeting_status_handler))
        // --- Ledger reports ---
        .route("/api/budgets/progress", get(ledger::budget_progress_handler))
        .route("/api/goals/{id}/contribute", post(ledger::contribute_handler))
        .route("/api/overview", get(ledger::overview_handler))
        // --- Investment reports ---
        .route("/api/investments/summary", get(investments::summary_handler))
        .route("/api/investments/zakat", post(investments::zakat_handler))
        .route("/api/investments/prices/{symbol}", get(investments::prices_handler))
        .route("/api/investments/{id}/trend", get(investments::trend_handler))
        // --- Settings ---
        .route(
            "/api/settings",
            get(settings::get_settings_handler).put(settings::update_settings_handler),
        )
        .route("/api/settings/reset", post(settings::reset_settings_handler))
        .route("/api/settings/password", post(settings::change_password_handler))
        // --- Notifications ---
        .route("/api/notifications", get(notifications::list_notifications_handler))
        .route(
            "/api/notifications/unread-count",
            get(notifications::unread_count_handler),
        )
        .route(
            "/api/notifications/read-all",
            put(notifications::mark_all_read_handler),
        )
        .route(
            "/api/notifications/broadcast",
            post(notifications::broadcast_handler),
        )
        .route(
            "/api/notifications/{id}/read",
            put(notifications::mark_read_handler),
        )
        .route(
            "/api/notifications/{id}",
            delete(notifications::delete_notification_handler),
        )
        // --- Admin ---
        .route("/api/admin/users", get(admin::list_users_handler));

    // --- Ledger CRUD, one set of routes per entry kind ---
    let protected_routes = ledger_routes::<Expense>(protected_routes, "/api/expenses");
    let protected_routes = ledger_routes::<Income>(protected_routes, "/api/incomes");
    let protected_routes = ledger_routes::<Budget>(protected_routes, "/api/budgets");
    let protected_routes = ledger_routes::<Goal>(protected_routes, "/api/goals");
    let protected_routes = ledger_routes::<Category>(protected_routes, "/api/categories");
    let protected_routes = ledger_routes::<Investment>(protected_routes, "/api/investments")
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use guroosh_core::Role;

    #[test]
    fn blank_filters_mean_no_filter() {
        assert_eq!(parse_filter::<Role>(None).unwrap(), None);
        assert_eq!(parse_filter::<Role>(Some("  ")).unwrap(), None);
        assert_eq!(parse_filter::<Role>(Some("advisor")).unwrap(), Some(Role::Advisor));
        assert!(matches!(
            parse_filter::<Role>(Some("owner")),
            Err(ApiError::BadRequest(_))
        ));
    }
}
