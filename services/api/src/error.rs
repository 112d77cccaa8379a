//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how it is
//! rendered as an HTTP response.
//!
//! Every failure reaches the client as `{"error": "<message>"}` with a matching
//! status code. Internal failures are logged and answered with a generic message.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use guroosh_core::{ConnectionStatus, PortError, TransitionError};
use jsonwebtoken::errors::ErrorKind;
use serde_json::json;
use tracing::error;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the storage ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A request violated a workflow rule.
    #[error("{0}")]
    Transition(#[from] TransitionError),

    #[error("{0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    NotImplemented(String),

    /// A connection request for the same user and advisor already exists.
    #[error("Connection request already exists")]
    AlreadyRequested(ConnectionStatus),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::NotImplemented(msg) => (StatusCode::NOT_IMPLEMENTED, msg.clone()),
            ApiError::AlreadyRequested(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Validation(errors) => (StatusCode::BAD_REQUEST, describe_validation(errors)),
            ApiError::Transition(e) if e.is_permission() => (StatusCode::FORBIDDEN, e.to_string()),
            ApiError::Transition(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Token(e) => match e.kind() {
                ErrorKind::ExpiredSignature => (StatusCode::UNAUTHORIZED, "Token expired".to_string()),
                _ => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
            },
            ApiError::Port(PortError::NotFound(msg)) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Port(PortError::Conflict(msg)) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Port(PortError::Unauthorized) => {
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
            ApiError::Port(PortError::Unexpected(_))
            | ApiError::Config(_)
            | ApiError::Database(_)
            | ApiError::Migration(_)
            | ApiError::Io(_)
            | ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = match &self {
            ApiError::AlreadyRequested(existing) => json!({ "error": message, "status": existing }),
            _ => json!({ "error": message }),
        };
        (status, Json(body)).into_response()
    }
}

/// Flattens validator output into one readable sentence, in field order.
fn describe_validation(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    let messages: Vec<String> = fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| match &err.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect();

    if messages.is_empty() {
        "Invalid request".to_string()
    } else {
        messages.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use validator::Validate;

    async fn render(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[derive(Validate)]
    struct Signup {
        #[validate(email(message = "Email is invalid"))]
        email: String,
        #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
        password: String,
    }

    #[tokio::test]
    async fn validation_errors_are_bad_requests() {
        let errors = Signup {
            email: "nope".to_string(),
            password: "123".to_string(),
        }
        .validate()
        .unwrap_err();
        let (status, body) = render(ApiError::from(errors)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Email is invalid; Password must be at least 6 characters"
        );
    }

    #[tokio::test]
    async fn duplicate_connection_reports_existing_status() {
        let (status, body) = render(ApiError::AlreadyRequested(ConnectionStatus::Pending)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "pending");
    }

    #[tokio::test]
    async fn permission_transitions_are_forbidden() {
        let (status, _) = render(ApiError::from(TransitionError::NotAdvisor)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = render(ApiError::from(TransitionError::MeetingInPast)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn internal_details_are_not_leaked() {
        let (status, body) =
            render(ApiError::from(PortError::Unexpected("connection reset".to_string()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn port_not_found_is_404() {
        let (status, body) =
            render(ApiError::from(PortError::NotFound("Expense not found".to_string()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Expense not found");
    }
}
