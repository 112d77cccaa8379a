//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the PostgreSQL implementation of
//! every storage port from the `core` crate. It handles all interactions with the
//! database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use guroosh_core::{
    domain::NewUser,
    ports::{
        AdvisoryStore, LedgerDocument, LedgerStore, NotificationStore, PortError, PortResult,
        UserStore,
    },
    AdviceRequest, AdvisorProfile, ConnectionRequest, ConnectionStatus, Meeting, Message, Note,
    Notification, Role, User, UserCredentials, UserSettings,
};
use sqlx::{types::Json, FromRow, PgPool, Postgres, QueryBuilder};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

/// Rows per multi-row INSERT, well below the bind-parameter limit.
const INSERT_CHUNK: usize = 1000;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements every storage port on one connection pool.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn missing(what: &str, id: impl Display) -> PortError {
    PortError::NotFound(format!("{} {} not found", what, id))
}

/// Maps a unique-constraint violation to `Conflict`, anything else to `Unexpected`.
fn conflict_or_unexpected(e: sqlx::Error, message: &str) -> PortError {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PortError::Conflict(message.to_string())
        }
        other => unexpected(other),
    }
}

/// Parses a text column holding an enum variant.
fn column<T>(raw: &str) -> PortResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>()
        .map_err(|e| PortError::Unexpected(format!("Corrupt column value: {}", e)))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_COLUMNS: &str = "id, name, email, role, phone, email_verified, advisor_profile, \
                            connected_advisor, created_at, updated_at";

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    phone: Option<String>,
    email_verified: bool,
    advisor_profile: Option<Json<AdvisorProfile>>,
    connected_advisor: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            role: column(&self.role)?,
            phone: self.phone,
            email_verified: self.email_verified,
            advisor_profile: self.advisor_profile.map(|p| p.0),
            connected_advisor: self.connected_advisor,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    password_hash: String,
    verification_token: Option<String>,
    reset_token: Option<String>,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.id,
            email: self.email,
            password_hash: self.password_hash,
            verification_token: self.verification_token,
            reset_token: self.reset_token,
        }
    }
}

#[derive(FromRow)]
struct SettingsRecord {
    user_id: Uuid,
    currency: String,
    language: String,
    theme: String,
    email_notifications: bool,
    push_notifications: bool,
    budget_alerts: bool,
    updated_at: DateTime<Utc>,
}
impl SettingsRecord {
    fn to_domain(self) -> PortResult<UserSettings> {
        Ok(UserSettings {
            user_id: self.user_id,
            currency: self.currency,
            language: self.language,
            theme: column(&self.theme)?,
            email_notifications: self.email_notifications,
            push_notifications: self.push_notifications,
            budget_alerts: self.budget_alerts,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ConnectionRecord {
    id: Uuid,
    user_id: Uuid,
    advisor_id: Uuid,
    message: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    responded_at: Option<DateTime<Utc>>,
}
impl ConnectionRecord {
    fn to_domain(self) -> PortResult<ConnectionRequest> {
        Ok(ConnectionRequest {
            id: self.id,
            user_id: self.user_id,
            advisor_id: self.advisor_id,
            message: self.message,
            status: column(&self.status)?,
            created_at: self.created_at,
            responded_at: self.responded_at,
        })
    }
}

#[derive(FromRow)]
struct AdviceRequestRecord {
    id: Uuid,
    client_id: Uuid,
    advisor_id: Uuid,
    topic: String,
    description: String,
    budget: Option<String>,
    status: String,
    draft_response: Option<String>,
    deleted_by_client: bool,
    deleted_by_advisor: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl AdviceRequestRecord {
    fn to_domain(self) -> PortResult<AdviceRequest> {
        Ok(AdviceRequest {
            id: self.id,
            client_id: self.client_id,
            advisor_id: self.advisor_id,
            topic: self.topic,
            description: self.description,
            budget: self.budget,
            status: column(&self.status)?,
            draft_response: self.draft_response,
            deleted_by_client: self.deleted_by_client,
            deleted_by_advisor: self.deleted_by_advisor,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct MessageRecord {
    id: Uuid,
    request_id: Uuid,
    sender_id: Uuid,
    content: String,
    read: bool,
    created_at: DateTime<Utc>,
    edited_at: Option<DateTime<Utc>>,
}
impl MessageRecord {
    fn to_domain(self) -> Message {
        Message {
            id: self.id,
            request_id: self.request_id,
            sender_id: self.sender_id,
            content: self.content,
            read: self.read,
            created_at: self.created_at,
            edited_at: self.edited_at,
        }
    }
}

#[derive(FromRow)]
struct NoteRecord {
    id: Uuid,
    request_id: Uuid,
    author_id: Uuid,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl NoteRecord {
    fn to_domain(self) -> Note {
        Note {
            id: self.id,
            request_id: self.request_id,
            author_id: self.author_id,
            content: self.content,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct MeetingRecord {
    id: Uuid,
    request_id: Uuid,
    client_id: Uuid,
    advisor_id: Uuid,
    date_time: DateTime<Utc>,
    duration_minutes: i32,
    location: Option<String>,
    agenda: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl MeetingRecord {
    fn to_domain(self) -> PortResult<Meeting> {
        Ok(Meeting {
            id: self.id,
            request_id: self.request_id,
            client_id: self.client_id,
            advisor_id: self.advisor_id,
            date_time: self.date_time,
            duration_minutes: self.duration_minutes.max(0) as u32,
            location: self.location,
            agenda: self.agenda,
            status: column(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct NotificationRecord {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    title: String,
    message: String,
    link: Option<String>,
    read: bool,
    created_at: DateTime<Utc>,
}
impl NotificationRecord {
    fn to_domain(self) -> PortResult<Notification> {
        Ok(Notification {
            id: self.id,
            user_id: self.user_id,
            kind: column(&self.kind)?,
            title: self.title,
            message: self.message,
            link: self.link,
            read: self.read,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct LedgerRecord {
    id: Uuid,
    owner_id: Uuid,
    kind: String,
    occurred_at: DateTime<Utc>,
    body: serde_json::Value,
}
impl LedgerRecord {
    fn to_domain(self) -> LedgerDocument {
        LedgerDocument {
            id: self.id,
            owner_id: self.owner_id,
            kind: self.kind,
            occurred_at: self.occurred_at,
            body: self.body,
        }
    }
}

//=========================================================================================
// `UserStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserStore for DbAdapter {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, name, email, role, advisor_profile, password_hash, verification_token) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(new_user.role.as_str())
        .bind(new_user.advisor_profile.map(Json))
        .bind(&new_user.password_hash)
        .bind(&new_user.verification_token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_unexpected(e, "Email already registered"))?;
        record.to_domain()
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| missing("User", user_id))?
        .to_domain()
    }

    async fn update_user(&self, user: &User) -> PortResult<User> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET name = $2, role = $3, phone = $4, email_verified = $5, \
             advisor_profile = $6, connected_advisor = $7, updated_at = $8 \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(&user.phone)
        .bind(user.email_verified)
        .bind(user.advisor_profile.clone().map(Json))
        .bind(user.connected_advisor)
        .bind(user.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| missing("User", user.id))?
        .to_domain()
    }

    async fn list_users(&self, role: Option<Role>) -> PortResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE ($1::TEXT IS NULL OR role = $1) ORDER BY created_at ASC",
            USER_COLUMNS
        ))
        .bind(role.map(|r| r.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(UserRecord::to_domain).collect()
    }

    async fn list_clients_of(&self, advisor_id: Uuid) -> PortResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE connected_advisor = $1 ORDER BY name ASC",
            USER_COLUMNS
        ))
        .bind(advisor_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(UserRecord::to_domain).collect()
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, password_hash, verification_token, reset_token FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("No account for {}", email)))?;
        Ok(record.to_domain())
    }

    async fn get_credentials(&self, user_id: Uuid) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, password_hash, verification_token, reset_token FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| missing("User", user_id))?;
        Ok(record.to_domain())
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> PortResult<()> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(user_id)
                .bind(password_hash)
                .execute(&self.pool)
                .await
                .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(missing("User", user_id));
        }
        Ok(())
    }

    async fn verify_email(&self, token: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "UPDATE users SET email_verified = TRUE, verification_token = NULL, updated_at = NOW() \
             WHERE verification_token = $1 RETURNING id",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound("Verification token not found".to_string()))
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE users SET reset_token = $2, reset_token_expires_at = $3 WHERE id = $1",
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(missing("User", user_id));
        }
        Ok(())
    }

    async fn consume_reset_token(&self, token: &str, now: DateTime<Utc>) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "UPDATE users SET reset_token = NULL, reset_token_expires_at = NULL \
             WHERE reset_token = $1 AND reset_token_expires_at > $2 RETURNING id",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound("Reset token not found".to_string()))
    }

    async fn get_settings(&self, user_id: Uuid) -> PortResult<Option<UserSettings>> {
        sqlx::query_as::<_, SettingsRecord>("SELECT * FROM user_settings WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(SettingsRecord::to_domain)
            .transpose()
    }

    async fn save_settings(&self, settings: &UserSettings) -> PortResult<UserSettings> {
        sqlx::query_as::<_, SettingsRecord>(
            "INSERT INTO user_settings (user_id, currency, language, theme, email_notifications, \
             push_notifications, budget_alerts, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (user_id) DO UPDATE SET currency = EXCLUDED.currency, \
             language = EXCLUDED.language, theme = EXCLUDED.theme, \
             email_notifications = EXCLUDED.email_notifications, \
             push_notifications = EXCLUDED.push_notifications, \
             budget_alerts = EXCLUDED.budget_alerts, updated_at = EXCLUDED.updated_at \
             RETURNING *",
        )
        .bind(settings.user_id)
        .bind(&settings.currency)
        .bind(&settings.language)
        .bind(settings.theme.as_str())
        .bind(settings.email_notifications)
        .bind(settings.push_notifications)
        .bind(settings.budget_alerts)
        .bind(settings.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?
        .to_domain()
    }
}

//=========================================================================================
// `AdvisoryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AdvisoryStore for DbAdapter {
    async fn create_connection_request(
        &self,
        request: &ConnectionRequest,
    ) -> PortResult<ConnectionRequest> {
        sqlx::query_as::<_, ConnectionRecord>(
            "INSERT INTO connection_requests (id, user_id, advisor_id, message, status, created_at, responded_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(request.id)
        .bind(request.user_id)
        .bind(request.advisor_id)
        .bind(&request.message)
        .bind(request.status.as_str())
        .bind(request.created_at)
        .bind(request.responded_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_unexpected(e, "Connection request already exists"))?
        .to_domain()
    }

    async fn find_connection_request(
        &self,
        user_id: Uuid,
        advisor_id: Uuid,
    ) -> PortResult<Option<ConnectionRequest>> {
        sqlx::query_as::<_, ConnectionRecord>(
            "SELECT * FROM connection_requests WHERE user_id = $1 AND advisor_id = $2",
        )
        .bind(user_id)
        .bind(advisor_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(ConnectionRecord::to_domain)
        .transpose()
    }

    async fn get_connection_request(&self, request_id: Uuid) -> PortResult<ConnectionRequest> {
        sqlx::query_as::<_, ConnectionRecord>("SELECT * FROM connection_requests WHERE id = $1")
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| missing("Connection request", request_id))?
            .to_domain()
    }

    async fn list_connection_requests_for_advisor(
        &self,
        advisor_id: Uuid,
        status: Option<ConnectionStatus>,
    ) -> PortResult<Vec<ConnectionRequest>> {
        let records = sqlx::query_as::<_, ConnectionRecord>(
            "SELECT * FROM connection_requests WHERE advisor_id = $1 \
             AND ($2::TEXT IS NULL OR status = $2) ORDER BY created_at DESC",
        )
        .bind(advisor_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(ConnectionRecord::to_domain).collect()
    }

    async fn list_connection_requests_for_user(
        &self,
        user_id: Uuid,
    ) -> PortResult<Vec<ConnectionRequest>> {
        let records = sqlx::query_as::<_, ConnectionRecord>(
            "SELECT * FROM connection_requests WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(ConnectionRecord::to_domain).collect()
    }

    async fn update_connection_request(
        &self,
        request: &ConnectionRequest,
    ) -> PortResult<ConnectionRequest> {
        sqlx::query_as::<_, ConnectionRecord>(
            "UPDATE connection_requests SET message = $2, status = $3, responded_at = $4 \
             WHERE id = $1 RETURNING *",
        )
        .bind(request.id)
        .bind(&request.message)
        .bind(request.status.as_str())
        .bind(request.responded_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| missing("Connection request", request.id))?
        .to_domain()
    }

    // --- Advice Requests ---

    async fn create_request(&self, request: &AdviceRequest) -> PortResult<AdviceRequest> {
        sqlx::query_as::<_, AdviceRequestRecord>(
            "INSERT INTO advice_requests (id, client_id, advisor_id, topic, description, budget, \
             status, draft_response, deleted_by_client, deleted_by_advisor, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING *",
        )
        .bind(request.id)
        .bind(request.client_id)
        .bind(request.advisor_id)
        .bind(&request.topic)
        .bind(&request.description)
        .bind(&request.budget)
        .bind(request.status.as_str())
        .bind(&request.draft_response)
        .bind(request.deleted_by_client)
        .bind(request.deleted_by_advisor)
        .bind(request.created_at)
        .bind(request.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?
        .to_domain()
    }

    async fn get_request(&self, request_id: Uuid) -> PortResult<AdviceRequest> {
        sqlx::query_as::<_, AdviceRequestRecord>("SELECT * FROM advice_requests WHERE id = $1")
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| missing("Request", request_id))?
            .to_domain()
    }

    async fn list_requests_for(&self, user_id: Uuid) -> PortResult<Vec<AdviceRequest>> {
        let records = sqlx::query_as::<_, AdviceRequestRecord>(
            "SELECT * FROM advice_requests WHERE client_id = $1 OR advisor_id = $1 \
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(AdviceRequestRecord::to_domain).collect()
    }

    async fn update_request(&self, request: &AdviceRequest) -> PortResult<AdviceRequest> {
        sqlx::query_as::<_, AdviceRequestRecord>(
            "UPDATE advice_requests SET topic = $2, description = $3, budget = $4, status = $5, \
             draft_response = $6, deleted_by_client = $7, deleted_by_advisor = $8, updated_at = $9 \
             WHERE id = $1 RETURNING *",
        )
        .bind(request.id)
        .bind(&request.topic)
        .bind(&request.description)
        .bind(&request.budget)
        .bind(request.status.as_str())
        .bind(&request.draft_response)
        .bind(request.deleted_by_client)
        .bind(request.deleted_by_advisor)
        .bind(request.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| missing("Request", request.id))?
        .to_domain()
    }

    async fn delete_request(&self, request_id: Uuid) -> PortResult<()> {
        // Messages, notes and meetings go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM advice_requests WHERE id = $1")
            .bind(request_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(missing("Request", request_id));
        }
        Ok(())
    }

    // --- Messages ---

    async fn create_message(&self, message: &Message) -> PortResult<Message> {
        let record = sqlx::query_as::<_, MessageRecord>(
            "INSERT INTO messages (id, request_id, sender_id, content, read, created_at, edited_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(message.id)
        .bind(message.request_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(message.read)
        .bind(message.created_at)
        .bind(message.edited_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_message(&self, message_id: Uuid) -> PortResult<Message> {
        let record = sqlx::query_as::<_, MessageRecord>("SELECT * FROM messages WHERE id = $1")
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| missing("Message", message_id))?;
        Ok(record.to_domain())
    }

    async fn list_messages(
        &self,
        request_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> PortResult<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            "SELECT * FROM messages WHERE request_id = $1 \
             AND ($2::TIMESTAMPTZ IS NULL OR created_at > $2) ORDER BY created_at ASC",
        )
        .bind(request_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(MessageRecord::to_domain).collect())
    }

    async fn update_message(&self, message: &Message) -> PortResult<Message> {
        let record = sqlx::query_as::<_, MessageRecord>(
            "UPDATE messages SET content = $2, read = $3, edited_at = $4 WHERE id = $1 RETURNING *",
        )
        .bind(message.id)
        .bind(&message.content)
        .bind(message.read)
        .bind(message.edited_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| missing("Message", message.id))?;
        Ok(record.to_domain())
    }

    async fn delete_message(&self, message_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(message_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(missing("Message", message_id));
        }
        Ok(())
    }

    async fn mark_messages_read(&self, request_id: Uuid, reader_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET read = TRUE WHERE request_id = $1 AND sender_id <> $2 AND NOT read",
        )
        .bind(request_id)
        .bind(reader_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn count_unread_messages(&self, user_id: Uuid) -> PortResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM messages m JOIN advice_requests r ON r.id = m.request_id \
             WHERE (r.client_id = $1 OR r.advisor_id = $1) AND m.sender_id <> $1 AND NOT m.read \
               AND NOT ((r.client_id = $1 AND r.deleted_by_client) \
                     OR (r.advisor_id = $1 AND r.deleted_by_advisor))",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(count.max(0) as u64)
    }

    // --- Notes ---

    async fn create_note(&self, note: &Note) -> PortResult<Note> {
        let record = sqlx::query_as::<_, NoteRecord>(
            "INSERT INTO notes (id, request_id, author_id, content, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(note.id)
        .bind(note.request_id)
        .bind(note.author_id)
        .bind(&note.content)
        .bind(note.created_at)
        .bind(note.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_note(&self, note_id: Uuid) -> PortResult<Note> {
        let record = sqlx::query_as::<_, NoteRecord>("SELECT * FROM notes WHERE id = $1")
            .bind(note_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| missing("Note", note_id))?;
        Ok(record.to_domain())
    }

    async fn list_notes(&self, request_id: Uuid, author_id: Uuid) -> PortResult<Vec<Note>> {
        let records = sqlx::query_as::<_, NoteRecord>(
            "SELECT * FROM notes WHERE request_id = $1 AND author_id = $2 ORDER BY created_at ASC",
        )
        .bind(request_id)
        .bind(author_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(NoteRecord::to_domain).collect())
    }

    async fn update_note(&self, note: &Note) -> PortResult<Note> {
        let record = sqlx::query_as::<_, NoteRecord>(
            "UPDATE notes SET content = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(note.id)
        .bind(&note.content)
        .bind(note.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| missing("Note", note.id))?;
        Ok(record.to_domain())
    }

    async fn delete_note(&self, note_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(note_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(missing("Note", note_id));
        }
        Ok(())
    }

    // --- Meetings ---

    async fn create_meeting(&self, meeting: &Meeting) -> PortResult<Meeting> {
        sqlx::query_as::<_, MeetingRecord>(
            "INSERT INTO meetings (id, request_id, client_id, advisor_id, date_time, duration_minutes, \
             location, agenda, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
        )
        .bind(meeting.id)
        .bind(meeting.request_id)
        .bind(meeting.client_id)
        .bind(meeting.advisor_id)
        .bind(meeting.date_time)
        .bind(meeting.duration_minutes as i32)
        .bind(&meeting.location)
        .bind(&meeting.agenda)
        .bind(meeting.status.as_str())
        .bind(meeting.created_at)
        .bind(meeting.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?
        .to_domain()
    }

    async fn get_meeting(&self, meeting_id: Uuid) -> PortResult<Meeting> {
        sqlx::query_as::<_, MeetingRecord>("SELECT * FROM meetings WHERE id = $1")
            .bind(meeting_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| missing("Meeting", meeting_id))?
            .to_domain()
    }

    async fn list_meetings_for_user(&self, user_id: Uuid) -> PortResult<Vec<Meeting>> {
        let records = sqlx::query_as::<_, MeetingRecord>(
            "SELECT * FROM meetings WHERE client_id = $1 OR advisor_id = $1 ORDER BY date_time ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(MeetingRecord::to_domain).collect()
    }

    async fn list_meetings_for_request(&self, request_id: Uuid) -> PortResult<Vec<Meeting>> {
        let records = sqlx::query_as::<_, MeetingRecord>(
            "SELECT * FROM meetings WHERE request_id = $1 ORDER BY date_time ASC",
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(MeetingRecord::to_domain).collect()
    }

    async fn update_meeting(&self, meeting: &Meeting) -> PortResult<Meeting> {
        sqlx::query_as::<_, MeetingRecord>(
            "UPDATE meetings SET date_time = $2, duration_minutes = $3, location = $4, agenda = $5, \
             status = $6, updated_at = $7 WHERE id = $1 RETURNING *",
        )
        .bind(meeting.id)
        .bind(meeting.date_time)
        .bind(meeting.duration_minutes as i32)
        .bind(&meeting.location)
        .bind(&meeting.agenda)
        .bind(meeting.status.as_str())
        .bind(meeting.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| missing("Meeting", meeting.id))?
        .to_domain()
    }

    async fn delete_meeting(&self, meeting_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM meetings WHERE id = $1")
            .bind(meeting_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(missing("Meeting", meeting_id));
        }
        Ok(())
    }
}

//=========================================================================================
// `NotificationStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl NotificationStore for DbAdapter {
    async fn insert_notifications(&self, notifications: &[Notification]) -> PortResult<usize> {
        if notifications.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        for chunk in notifications.chunks(INSERT_CHUNK) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO notifications (id, user_id, kind, title, message, link, read, created_at) ",
            );
            builder.push_values(chunk, |mut row, n| {
                row.push_bind(n.id)
                    .push_bind(n.user_id)
                    .push_bind(n.kind.as_str())
                    .push_bind(n.title.as_str())
                    .push_bind(n.message.as_str())
                    .push_bind(n.link.as_deref())
                    .push_bind(n.read)
                    .push_bind(n.created_at);
            });
            builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
        }
        tx.commit().await.map_err(unexpected)?;
        Ok(notifications.len())
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        since: Option<DateTime<Utc>>,
    ) -> PortResult<Vec<Notification>> {
        let records = sqlx::query_as::<_, NotificationRecord>(
            "SELECT * FROM notifications WHERE user_id = $1 AND (NOT $2 OR NOT read) \
             AND ($3::TIMESTAMPTZ IS NULL OR created_at > $3) ORDER BY created_at DESC",
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(NotificationRecord::to_domain).collect()
    }

    async fn count_unread_notifications(&self, user_id: Uuid) -> PortResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT read",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(count.max(0) as u64)
    }

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> PortResult<Notification> {
        sqlx::query_as::<_, NotificationRecord>(
            "UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2 RETURNING *",
        )
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| missing("Notification", notification_id))?
        .to_domain()
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> PortResult<u64> {
        let result =
            sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = $1 AND NOT read")
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn delete_notification(&self, notification_id: Uuid, user_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(notification_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(missing("Notification", notification_id));
        }
        Ok(())
    }
}

//=========================================================================================
// `LedgerStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl LedgerStore for DbAdapter {
    async fn insert_document(&self, document: LedgerDocument) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO ledger_documents (id, owner_id, kind, occurred_at, body) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(document.id)
        .bind(document.owner_id)
        .bind(&document.kind)
        .bind(document.occurred_at)
        .bind(&document.body)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_unexpected(e, "Document already exists"))?;
        Ok(())
    }

    async fn get_document(
        &self,
        kind: &str,
        owner_id: Uuid,
        id: Uuid,
    ) -> PortResult<LedgerDocument> {
        let record = sqlx::query_as::<_, LedgerRecord>(
            "SELECT * FROM ledger_documents WHERE id = $1 AND kind = $2 AND owner_id = $3",
        )
        .bind(id)
        .bind(kind)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| missing(kind, id))?;
        Ok(record.to_domain())
    }

    async fn list_documents(&self, kind: &str, owner_id: Uuid) -> PortResult<Vec<LedgerDocument>> {
        let records = sqlx::query_as::<_, LedgerRecord>(
            "SELECT * FROM ledger_documents WHERE kind = $1 AND owner_id = $2 \
             ORDER BY occurred_at DESC",
        )
        .bind(kind)
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(LedgerRecord::to_domain).collect())
    }

    async fn replace_document(&self, document: LedgerDocument) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE ledger_documents SET occurred_at = $4, body = $5 \
             WHERE id = $1 AND kind = $2 AND owner_id = $3",
        )
        .bind(document.id)
        .bind(&document.kind)
        .bind(document.owner_id)
        .bind(document.occurred_at)
        .bind(&document.body)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(missing(&document.kind, document.id));
        }
        Ok(())
    }

    async fn delete_document(&self, kind: &str, owner_id: Uuid, id: Uuid) -> PortResult<()> {
        let result = sqlx::query(
            "DELETE FROM ledger_documents WHERE id = $1 AND kind = $2 AND owner_id = $3",
        )
        .bind(id)
        .bind(kind)
        .bind(owner_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(missing(kind, id));
        }
        Ok(())
    }
}
