//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of every storage port, selected with
//! `DATABASE_URL=memory://`. Used for local development and by the integration tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use guroosh_core::{
    domain::NewUser,
    ports::{
        AdvisoryStore, LedgerDocument, LedgerStore, NotificationStore, PortError, PortResult,
        UserStore,
    },
    AdviceRequest, ConnectionRequest, ConnectionStatus, Meeting, Message, Note, Notification,
    Role, User, UserCredentials, UserSettings,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

//=========================================================================================
// Tables
//=========================================================================================

struct StoredUser {
    user: User,
    password_hash: String,
    verification_token: Option<String>,
    reset_token: Option<String>,
    reset_token_expires_at: Option<DateTime<Utc>>,
}

impl StoredUser {
    fn credentials(&self) -> UserCredentials {
        UserCredentials {
            user_id: self.user.id,
            email: self.user.email.clone(),
            password_hash: self.password_hash.clone(),
            verification_token: self.verification_token.clone(),
            reset_token: self.reset_token.clone(),
        }
    }
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, StoredUser>,
    settings: HashMap<Uuid, UserSettings>,
    connections: HashMap<Uuid, ConnectionRequest>,
    requests: HashMap<Uuid, AdviceRequest>,
    messages: HashMap<Uuid, Message>,
    notes: HashMap<Uuid, Note>,
    meetings: HashMap<Uuid, Meeting>,
    notifications: HashMap<Uuid, Notification>,
    documents: HashMap<Uuid, LedgerDocument>,
}

/// Keeps every table behind a single lock, so each port call is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing(what: &str, id: Uuid) -> PortError {
    PortError::NotFound(format!("{} {} not found", what, id))
}

/// Replaces an existing row, failing when there is nothing to replace.
fn replace<T: Clone>(table: &mut HashMap<Uuid, T>, id: Uuid, row: &T, what: &str) -> PortResult<T> {
    match table.get_mut(&id) {
        Some(slot) => {
            *slot = row.clone();
            Ok(row.clone())
        }
        None => Err(missing(what, id)),
    }
}

//=========================================================================================
// `UserStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.user.email == new_user.email) {
            return Err(PortError::Conflict("Email already registered".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            role: new_user.role,
            phone: None,
            email_verified: false,
            advisor_profile: new_user.advisor_profile,
            connected_advisor: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(
            user.id,
            StoredUser {
                user: user.clone(),
                password_hash: new_user.password_hash,
                verification_token: new_user.verification_token,
                reset_token: None,
                reset_token_expires_at: None,
            },
        );
        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .get(&user_id)
            .map(|u| u.user.clone())
            .ok_or_else(|| missing("User", user_id))
    }

    async fn update_user(&self, user: &User) -> PortResult<User> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .users
            .get_mut(&user.id)
            .ok_or_else(|| missing("User", user.id))?;
        stored.user = user.clone();
        Ok(user.clone())
    }

    async fn list_users(&self, role: Option<Role>) -> PortResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables
            .users
            .values()
            .filter(|u| role.map_or(true, |r| u.user.role == r))
            .map(|u| u.user.clone())
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    async fn list_clients_of(&self, advisor_id: Uuid) -> PortResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut clients: Vec<User> = tables
            .users
            .values()
            .filter(|u| u.user.connected_advisor == Some(advisor_id))
            .map(|u| u.user.clone())
            .collect();
        clients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clients)
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let tables = self.tables.read().await;
        tables
            .users
            .values()
            .find(|u| u.user.email == email)
            .map(StoredUser::credentials)
            .ok_or_else(|| PortError::NotFound(format!("No account for {}", email)))
    }

    async fn get_credentials(&self, user_id: Uuid) -> PortResult<UserCredentials> {
        let tables = self.tables.read().await;
        tables
            .users
            .get(&user_id)
            .map(StoredUser::credentials)
            .ok_or_else(|| missing("User", user_id))
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| missing("User", user_id))?;
        stored.password_hash = password_hash.to_string();
        stored.user.updated_at = Utc::now();
        Ok(())
    }

    async fn verify_email(&self, token: &str) -> PortResult<Uuid> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .users
            .values_mut()
            .find(|u| u.verification_token.as_deref() == Some(token))
            .ok_or_else(|| PortError::NotFound("Verification token not found".to_string()))?;
        stored.verification_token = None;
        stored.user.email_verified = true;
        stored.user.updated_at = Utc::now();
        Ok(stored.user.id)
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| missing("User", user_id))?;
        stored.reset_token = Some(token.to_string());
        stored.reset_token_expires_at = Some(expires_at);
        Ok(())
    }

    async fn consume_reset_token(&self, token: &str, now: DateTime<Utc>) -> PortResult<Uuid> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .users
            .values_mut()
            .find(|u| {
                u.reset_token.as_deref() == Some(token)
                    && u.reset_token_expires_at.map_or(false, |exp| exp > now)
            })
            .ok_or_else(|| PortError::NotFound("Reset token not found".to_string()))?;
        stored.reset_token = None;
        stored.reset_token_expires_at = None;
        Ok(stored.user.id)
    }

    async fn get_settings(&self, user_id: Uuid) -> PortResult<Option<UserSettings>> {
        let tables = self.tables.read().await;
        Ok(tables.settings.get(&user_id).cloned())
    }

    async fn save_settings(&self, settings: &UserSettings) -> PortResult<UserSettings> {
        let mut tables = self.tables.write().await;
        tables.settings.insert(settings.user_id, settings.clone());
        Ok(settings.clone())
    }
}

//=========================================================================================
// `AdvisoryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AdvisoryStore for MemoryStore {
    async fn create_connection_request(
        &self,
        request: &ConnectionRequest,
    ) -> PortResult<ConnectionRequest> {
        let mut tables = self.tables.write().await;
        if tables
            .connections
            .values()
            .any(|c| c.user_id == request.user_id && c.advisor_id == request.advisor_id)
        {
            return Err(PortError::Conflict(
                "Connection request already exists".to_string(),
            ));
        }
        tables.connections.insert(request.id, request.clone());
        Ok(request.clone())
    }

    async fn find_connection_request(
        &self,
        user_id: Uuid,
        advisor_id: Uuid,
    ) -> PortResult<Option<ConnectionRequest>> {
        let tables = self.tables.read().await;
        Ok(tables
            .connections
            .values()
            .find(|c| c.user_id == user_id && c.advisor_id == advisor_id)
            .cloned())
    }

    async fn get_connection_request(&self, request_id: Uuid) -> PortResult<ConnectionRequest> {
        let tables = self.tables.read().await;
        tables
            .connections
            .get(&request_id)
            .cloned()
            .ok_or_else(|| missing("Connection request", request_id))
    }

    async fn list_connection_requests_for_advisor(
        &self,
        advisor_id: Uuid,
        status: Option<ConnectionStatus>,
    ) -> PortResult<Vec<ConnectionRequest>> {
        let tables = self.tables.read().await;
        let mut found: Vec<ConnectionRequest> = tables
            .connections
            .values()
            .filter(|c| c.advisor_id == advisor_id)
            .filter(|c| status.map_or(true, |s| c.status == s))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn list_connection_requests_for_user(
        &self,
        user_id: Uuid,
    ) -> PortResult<Vec<ConnectionRequest>> {
        let tables = self.tables.read().await;
        let mut found: Vec<ConnectionRequest> = tables
            .connections
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn update_connection_request(
        &self,
        request: &ConnectionRequest,
    ) -> PortResult<ConnectionRequest> {
        let mut tables = self.tables.write().await;
        replace(&mut tables.connections, request.id, request, "Connection request")
    }

    // --- Advice Requests ---

    async fn create_request(&self, request: &AdviceRequest) -> PortResult<AdviceRequest> {
        let mut tables = self.tables.write().await;
        tables.requests.insert(request.id, request.clone());
        Ok(request.clone())
    }

    async fn get_request(&self, request_id: Uuid) -> PortResult<AdviceRequest> {
        let tables = self.tables.read().await;
        tables
            .requests
            .get(&request_id)
            .cloned()
            .ok_or_else(|| missing("Request", request_id))
    }

    async fn list_requests_for(&self, user_id: Uuid) -> PortResult<Vec<AdviceRequest>> {
        let tables = self.tables.read().await;
        let mut found: Vec<AdviceRequest> = tables
            .requests
            .values()
            .filter(|r| r.participant(user_id).is_some())
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn update_request(&self, request: &AdviceRequest) -> PortResult<AdviceRequest> {
        let mut tables = self.tables.write().await;
        replace(&mut tables.requests, request.id, request, "Request")
    }

    async fn delete_request(&self, request_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .requests
            .remove(&request_id)
            .ok_or_else(|| missing("Request", request_id))?;
        tables.messages.retain(|_, m| m.request_id != request_id);
        tables.notes.retain(|_, n| n.request_id != request_id);
        tables.meetings.retain(|_, m| m.request_id != request_id);
        Ok(())
    }

    // --- Messages ---

    async fn create_message(&self, message: &Message) -> PortResult<Message> {
        let mut tables = self.tables.write().await;
        tables.messages.insert(message.id, message.clone());
        Ok(message.clone())
    }

    async fn get_message(&self, message_id: Uuid) -> PortResult<Message> {
        let tables = self.tables.read().await;
        tables
            .messages
            .get(&message_id)
            .cloned()
            .ok_or_else(|| missing("Message", message_id))
    }

    async fn list_messages(
        &self,
        request_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> PortResult<Vec<Message>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Message> = tables
            .messages
            .values()
            .filter(|m| m.request_id == request_id)
            .filter(|m| since.map_or(true, |s| m.created_at > s))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(found)
    }

    async fn update_message(&self, message: &Message) -> PortResult<Message> {
        let mut tables = self.tables.write().await;
        replace(&mut tables.messages, message.id, message, "Message")
    }

    async fn delete_message(&self, message_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .messages
            .remove(&message_id)
            .map(|_| ())
            .ok_or_else(|| missing("Message", message_id))
    }

    async fn mark_messages_read(&self, request_id: Uuid, reader_id: Uuid) -> PortResult<u64> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for message in tables.messages.values_mut() {
            if message.request_id == request_id && message.sender_id != reader_id && !message.read {
                message.read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn count_unread_messages(&self, user_id: Uuid) -> PortResult<u64> {
        let tables = self.tables.read().await;
        let count = tables
            .messages
            .values()
            .filter(|m| !m.read && m.sender_id != user_id)
            .filter(|m| {
                tables
                    .requests
                    .get(&m.request_id)
                    .map_or(false, |r| {
                        r.participant(user_id).is_some() && !r.is_hidden_from(user_id)
                    })
            })
            .count();
        Ok(count as u64)
    }

    // --- Notes ---

    async fn create_note(&self, note: &Note) -> PortResult<Note> {
        let mut tables = self.tables.write().await;
        tables.notes.insert(note.id, note.clone());
        Ok(note.clone())
    }

    async fn get_note(&self, note_id: Uuid) -> PortResult<Note> {
        let tables = self.tables.read().await;
        tables
            .notes
            .get(&note_id)
            .cloned()
            .ok_or_else(|| missing("Note", note_id))
    }

    async fn list_notes(&self, request_id: Uuid, author_id: Uuid) -> PortResult<Vec<Note>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Note> = tables
            .notes
            .values()
            .filter(|n| n.request_id == request_id && n.author_id == author_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(found)
    }

    async fn update_note(&self, note: &Note) -> PortResult<Note> {
        let mut tables = self.tables.write().await;
        replace(&mut tables.notes, note.id, note, "Note")
    }

    async fn delete_note(&self, note_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .notes
            .remove(&note_id)
            .map(|_| ())
            .ok_or_else(|| missing("Note", note_id))
    }

    // --- Meetings ---

    async fn create_meeting(&self, meeting: &Meeting) -> PortResult<Meeting> {
        let mut tables = self.tables.write().await;
        tables.meetings.insert(meeting.id, meeting.clone());
        Ok(meeting.clone())
    }

    async fn get_meeting(&self, meeting_id: Uuid) -> PortResult<Meeting> {
        let tables = self.tables.read().await;
        tables
            .meetings
            .get(&meeting_id)
            .cloned()
            .ok_or_else(|| missing("Meeting", meeting_id))
    }

    async fn list_meetings_for_user(&self, user_id: Uuid) -> PortResult<Vec<Meeting>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Meeting> = tables
            .meetings
            .values()
            .filter(|m| m.involves(user_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.date_time.cmp(&b.date_time));
        Ok(found)
    }

    async fn list_meetings_for_request(&self, request_id: Uuid) -> PortResult<Vec<Meeting>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Meeting> = tables
            .meetings
            .values()
            .filter(|m| m.request_id == request_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.date_time.cmp(&b.date_time));
        Ok(found)
    }

    async fn update_meeting(&self, meeting: &Meeting) -> PortResult<Meeting> {
        let mut tables = self.tables.write().await;
        replace(&mut tables.meetings, meeting.id, meeting, "Meeting")
    }

    async fn delete_meeting(&self, meeting_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .meetings
            .remove(&meeting_id)
            .map(|_| ())
            .ok_or_else(|| missing("Meeting", meeting_id))
    }
}

//=========================================================================================
// `NotificationStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notifications(&self, notifications: &[Notification]) -> PortResult<usize> {
        let mut tables = self.tables.write().await;
        for notification in notifications {
            tables
                .notifications
                .insert(notification.id, notification.clone());
        }
        Ok(notifications.len())
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        since: Option<DateTime<Utc>>,
    ) -> PortResult<Vec<Notification>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Notification> = tables
            .notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .filter(|n| !unread_only || !n.read)
            .filter(|n| since.map_or(true, |s| n.created_at > s))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn count_unread_notifications(&self, user_id: Uuid) -> PortResult<u64> {
        let tables = self.tables.read().await;
        let count = tables
            .notifications
            .values()
            .filter(|n| n.user_id == user_id && !n.read)
            .count();
        Ok(count as u64)
    }

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> PortResult<Notification> {
        let mut tables = self.tables.write().await;
        let notification = tables
            .notifications
            .get_mut(&notification_id)
            .filter(|n| n.user_id == user_id)
            .ok_or_else(|| missing("Notification", notification_id))?;
        notification.read = true;
        Ok(notification.clone())
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> PortResult<u64> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for notification in tables.notifications.values_mut() {
            if notification.user_id == user_id && !notification.read {
                notification.read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete_notification(&self, notification_id: Uuid, user_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        match tables.notifications.get(&notification_id) {
            Some(n) if n.user_id == user_id => {
                tables.notifications.remove(&notification_id);
                Ok(())
            }
            _ => Err(missing("Notification", notification_id)),
        }
    }
}

//=========================================================================================
// `LedgerStore` Trait Implementation
//=========================================================================================

fn owns(document: &LedgerDocument, kind: &str, owner_id: Uuid) -> bool {
    document.kind == kind && document.owner_id == owner_id
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn insert_document(&self, document: LedgerDocument) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        if tables.documents.contains_key(&document.id) {
            return Err(PortError::Conflict(format!(
                "Document {} already exists",
                document.id
            )));
        }
        tables.documents.insert(document.id, document);
        Ok(())
    }

    async fn get_document(
        &self,
        kind: &str,
        owner_id: Uuid,
        id: Uuid,
    ) -> PortResult<LedgerDocument> {
        let tables = self.tables.read().await;
        tables
            .documents
            .get(&id)
            .filter(|d| owns(d, kind, owner_id))
            .cloned()
            .ok_or_else(|| missing(kind, id))
    }

    async fn list_documents(&self, kind: &str, owner_id: Uuid) -> PortResult<Vec<LedgerDocument>> {
        let tables = self.tables.read().await;
        Ok(tables
            .documents
            .values()
            .filter(|d| owns(d, kind, owner_id))
            .cloned()
            .collect())
    }

    async fn replace_document(&self, document: LedgerDocument) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        match tables.documents.get_mut(&document.id) {
            Some(slot) if owns(slot, &document.kind, document.owner_id) => {
                *slot = document;
                Ok(())
            }
            _ => Err(missing(&document.kind, document.id)),
        }
    }

    async fn delete_document(&self, kind: &str, owner_id: Uuid, id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        match tables.documents.get(&id) {
            Some(d) if owns(d, kind, owner_id) => {
                tables.documents.remove(&id);
                Ok(())
            }
            _ => Err(missing(kind, id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use guroosh_core::{domain::NewAdviceRequest, NotificationKind};

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Test".to_string(),
            email: email.to_string(),
            role: Role::User,
            advisor_profile: None,
            password_hash: "hash".to_string(),
            verification_token: Some(format!("verify-{}", email)),
        }
    }

    fn advice_request(client: Uuid, advisor: Uuid) -> AdviceRequest {
        AdviceRequest::new(
            client,
            NewAdviceRequest {
                advisor_id: advisor,
                topic: "Retirement".to_string(),
                description: "Where do I start?".to_string(),
                budget: None,
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn duplicate_emails_conflict() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@example.com")).await.unwrap();
        let err = store.create_user(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
    }

    #[tokio::test]
    async fn verification_token_is_single_use() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@example.com")).await.unwrap();
        assert_eq!(store.verify_email("verify-a@example.com").await.unwrap(), user.id);
        assert!(store.get_user(user.id).await.unwrap().email_verified);
        assert!(store.verify_email("verify-a@example.com").await.is_err());
    }

    #[tokio::test]
    async fn expired_reset_tokens_are_rejected() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@example.com")).await.unwrap();
        let now = Utc::now();
        store
            .set_reset_token(user.id, "reset", now + Duration::minutes(5))
            .await
            .unwrap();

        let later = now + Duration::minutes(10);
        assert!(store.consume_reset_token("reset", later).await.is_err());
        assert_eq!(store.consume_reset_token("reset", now).await.unwrap(), user.id);
        assert!(store.consume_reset_token("reset", now).await.is_err());
    }

    #[tokio::test]
    async fn unread_messages_exclude_own_and_foreign_requests() {
        let store = MemoryStore::new();
        let (client, advisor, stranger) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let request = store
            .create_request(&advice_request(client, advisor))
            .await
            .unwrap();
        let now = Utc::now();
        store
            .create_message(&Message::new(request.id, client, "hello", now))
            .await
            .unwrap();
        store
            .create_message(&Message::new(request.id, advisor, "hi", now))
            .await
            .unwrap();

        assert_eq!(store.count_unread_messages(advisor).await.unwrap(), 1);
        assert_eq!(store.count_unread_messages(client).await.unwrap(), 1);
        assert_eq!(store.count_unread_messages(stranger).await.unwrap(), 0);

        assert_eq!(store.mark_messages_read(request.id, advisor).await.unwrap(), 1);
        assert_eq!(store.count_unread_messages(advisor).await.unwrap(), 0);
        assert_eq!(store.count_unread_messages(client).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn deleting_a_request_removes_its_thread() {
        let store = MemoryStore::new();
        let (client, advisor) = (Uuid::new_v4(), Uuid::new_v4());
        let request = store
            .create_request(&advice_request(client, advisor))
            .await
            .unwrap();
        let now = Utc::now();
        store
            .create_message(&Message::new(request.id, client, "hello", now))
            .await
            .unwrap();
        store
            .create_note(&Note::new(request.id, advisor, "call back", now))
            .await
            .unwrap();

        store.delete_request(request.id).await.unwrap();
        assert!(store.list_messages(request.id, None).await.unwrap().is_empty());
        assert!(store.list_notes(request.id, advisor).await.unwrap().is_empty());
        assert!(store.get_request(request.id).await.is_err());
    }

    #[tokio::test]
    async fn notifications_are_scoped_to_their_owner() {
        let store = MemoryStore::new();
        let (owner, other) = (Uuid::new_v4(), Uuid::new_v4());
        let notification =
            Notification::new(owner, NotificationKind::System, "Hi", "Welcome", None, Utc::now());
        store
            .insert_notifications(std::slice::from_ref(&notification))
            .await
            .unwrap();

        assert!(store.mark_notification_read(notification.id, other).await.is_err());
        assert!(store.delete_notification(notification.id, other).await.is_err());
        assert_eq!(store.count_unread_notifications(owner).await.unwrap(), 1);
        assert!(store.mark_notification_read(notification.id, owner).await.unwrap().read);
        assert_eq!(store.mark_all_notifications_read(owner).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ledger_documents_are_scoped_by_kind_and_owner() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let document = LedgerDocument {
            id: Uuid::new_v4(),
            owner_id: owner,
            kind: "expense".to_string(),
            occurred_at: Utc::now(),
            body: serde_json::json!({ "amount": 12.5 }),
        };
        store.insert_document(document.clone()).await.unwrap();

        assert!(store.get_document("expense", owner, document.id).await.is_ok());
        assert!(store.get_document("income", owner, document.id).await.is_err());
        assert!(store
            .get_document("expense", Uuid::new_v4(), document.id)
            .await
            .is_err());
        assert!(store
            .delete_document("expense", Uuid::new_v4(), document.id)
            .await
            .is_err());
        assert_eq!(store.list_documents("expense", owner).await.unwrap().len(), 1);
    }
}
