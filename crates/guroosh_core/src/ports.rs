//! crates/guroosh_core/src/ports.rs
//!
//! Defines the storage contracts (traits) the application core relies on.
//! These traits form the boundary of the hexagonal architecture: the web layer only
//! talks to them, and adapters (PostgreSQL, in-memory) implement them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    AdviceRequest, ConnectionRequest, ConnectionStatus, Meeting, Message, NewUser, Note,
    Notification, Role, User, UserCredentials, UserSettings,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from the storage backends.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait UserStore: Send + Sync {
    // --- Accounts ---
    /// Fails with `Conflict` when the e-mail is already registered.
    async fn create_user(&self, new_user: NewUser) -> PortResult<User>;

    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    /// Persists every mutable field of `user` (profile, role, connected advisor).
    async fn update_user(&self, user: &User) -> PortResult<User>;

    async fn list_users(&self, role: Option<Role>) -> PortResult<Vec<User>>;

    /// Users whose connected advisor is `advisor_id`.
    async fn list_clients_of(&self, advisor_id: Uuid) -> PortResult<Vec<User>>;

    // --- Credentials ---
    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_credentials(&self, user_id: Uuid) -> PortResult<UserCredentials>;

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> PortResult<()>;

    /// Marks the owner of `token` verified and clears the token.
    async fn verify_email(&self, token: &str) -> PortResult<Uuid>;

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Clears a reset token that is still valid at `now` and returns its owner.
    async fn consume_reset_token(&self, token: &str, now: DateTime<Utc>) -> PortResult<Uuid>;

    // --- Settings ---
    async fn get_settings(&self, user_id: Uuid) -> PortResult<Option<UserSettings>>;

    async fn save_settings(&self, settings: &UserSettings) -> PortResult<UserSettings>;
}

#[async_trait]
pub trait AdvisoryStore: Send + Sync {
    // --- Connection Requests ---
    async fn create_connection_request(
        &self,
        request: &ConnectionRequest,
    ) -> PortResult<ConnectionRequest>;

    async fn find_connection_request(
        &self,
        user_id: Uuid,
        advisor_id: Uuid,
    ) -> PortResult<Option<ConnectionRequest>>;

    async fn get_connection_request(&self, request_id: Uuid) -> PortResult<ConnectionRequest>;

    async fn list_connection_requests_for_advisor(
        &self,
        advisor_id: Uuid,
        status: Option<ConnectionStatus>,
    ) -> PortResult<Vec<ConnectionRequest>>;

    async fn list_connection_requests_for_user(
        &self,
        user_id: Uuid,
    ) -> PortResult<Vec<ConnectionRequest>>;

    async fn update_connection_request(
        &self,
        request: &ConnectionRequest,
    ) -> PortResult<ConnectionRequest>;

    // --- Advice Requests ---
    async fn create_request(&self, request: &AdviceRequest) -> PortResult<AdviceRequest>;

    async fn get_request(&self, request_id: Uuid) -> PortResult<AdviceRequest>;

    /// Requests where `user_id` is the client or the advisor, newest first.
    async fn list_requests_for(&self, user_id: Uuid) -> PortResult<Vec<AdviceRequest>>;

    async fn update_request(&self, request: &AdviceRequest) -> PortResult<AdviceRequest>;

    /// Removes the request together with its messages, notes and meetings.
    async fn delete_request(&self, request_id: Uuid) -> PortResult<()>;

    // --- Messages ---
    async fn create_message(&self, message: &Message) -> PortResult<Message>;

    async fn get_message(&self, message_id: Uuid) -> PortResult<Message>;

    /// Messages of a request, oldest first, optionally only those created after `since`.
    async fn list_messages(
        &self,
        request_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> PortResult<Vec<Message>>;

    async fn update_message(&self, message: &Message) -> PortResult<Message>;

    async fn delete_message(&self, message_id: Uuid) -> PortResult<()>;

    /// Marks messages of the request not sent by `reader_id` as read. Returns how many changed.
    async fn mark_messages_read(&self, request_id: Uuid, reader_id: Uuid) -> PortResult<u64>;

    /// Unread messages addressed to `user_id` across all their requests.
    async fn count_unread_messages(&self, user_id: Uuid) -> PortResult<u64>;

    // --- Notes ---
    async fn create_note(&self, note: &Note) -> PortResult<Note>;

    async fn get_note(&self, note_id: Uuid) -> PortResult<Note>;

    async fn list_notes(&self, request_id: Uuid, author_id: Uuid) -> PortResult<Vec<Note>>;

    async fn update_note(&self, note: &Note) -> PortResult<Note>;

    async fn delete_note(&self, note_id: Uuid) -> PortResult<()>;

    // --- Meetings ---
    async fn create_meeting(&self, meeting: &Meeting) -> PortResult<Meeting>;

    async fn get_meeting(&self, meeting_id: Uuid) -> PortResult<Meeting>;

    /// Meetings where `user_id` is the client or advisor, soonest first.
    async fn list_meetings_for_user(&self, user_id: Uuid) -> PortResult<Vec<Meeting>>;

    async fn list_meetings_for_request(&self, request_id: Uuid) -> PortResult<Vec<Meeting>>;

    async fn update_meeting(&self, meeting: &Meeting) -> PortResult<Meeting>;

    async fn delete_meeting(&self, meeting_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Inserts all notifications in one batch and returns how many were stored.
    async fn insert_notifications(&self, notifications: &[Notification]) -> PortResult<usize>;

    /// Notifications of `user_id`, newest first.
    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        since: Option<DateTime<Utc>>,
    ) -> PortResult<Vec<Notification>>;

    async fn count_unread_notifications(&self, user_id: Uuid) -> PortResult<u64>;

    /// Fails with `NotFound` when the notification does not belong to `user_id`.
    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> PortResult<Notification>;

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> PortResult<u64>;

    async fn delete_notification(&self, notification_id: Uuid, user_id: Uuid) -> PortResult<()>;
}

/// A ledger entry as stored: an owner-scoped JSON document of a given kind.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerDocument {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub kind: String,
    pub occurred_at: DateTime<Utc>,
    pub body: serde_json::Value,
}

/// Document storage for ledger entries. Typed access goes through [`crate::ledger::Ledger`].
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert_document(&self, document: LedgerDocument) -> PortResult<()>;

    /// Fails with `NotFound` when the document is missing or owned by someone else.
    async fn get_document(&self, kind: &str, owner_id: Uuid, id: Uuid) -> PortResult<LedgerDocument>;

    async fn list_documents(&self, kind: &str, owner_id: Uuid) -> PortResult<Vec<LedgerDocument>>;

    async fn replace_document(&self, document: LedgerDocument) -> PortResult<()>;

    async fn delete_document(&self, kind: &str, owner_id: Uuid, id: Uuid) -> PortResult<()>;
}
