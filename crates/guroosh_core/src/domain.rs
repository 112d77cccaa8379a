//! crates/guroosh_core/src/domain.rs
//!
//! Defines the core data structures of the advisory side of the application:
//! accounts, advisor profiles, connection and advice requests with their
//! conversation artefacts, user settings and notifications.
//!
//! Entities serialize to the camelCase JSON the web client consumes. Partial
//! updates arrive as typed patch structs that are validated before being applied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::not_blank;

//=========================================================================================
// Accounts
//=========================================================================================

text_enum! {
    /// The role an account plays in the application.
    pub enum Role {
        User => "user",
        Advisor => "advisor",
        Admin => "admin",
    }
}

text_enum! {
    pub enum Availability {
        Available => "Available",
        Busy => "Busy",
        Unavailable => "Unavailable",
    }
}

/// The public profile of an advisor. Present on every account with the advisor role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorProfile {
    pub bio: String,
    pub specializations: Vec<String>,
    pub hourly_rate: f64,
    pub availability: Availability,
    pub years_of_experience: u32,
}

impl Default for AdvisorProfile {
    fn default() -> Self {
        Self {
            bio: String::new(),
            specializations: Vec::new(),
            hourly_rate: 0.0,
            availability: Availability::Available,
            years_of_experience: 0,
        }
    }
}

impl AdvisorProfile {
    /// Case-insensitive substring match against any specialization.
    pub fn specializes_in(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        needle.is_empty()
            || self
                .specializations
                .iter()
                .any(|s| s.to_lowercase().contains(&needle))
    }
}

/// Represents an account. Credentials live in [`UserCredentials`] and never leave the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub email_verified: bool,
    pub advisor_profile: Option<AdvisorProfile>,
    pub connected_advisor: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_advisor(&self) -> bool {
        self.role == Role::Advisor
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Turns the account into an advisor account. Fields missing from `patch`
    /// keep their current value, or the profile default for a fresh profile.
    pub fn become_advisor(&mut self, patch: AdvisorProfilePatch, now: DateTime<Utc>) {
        let mut profile = self.advisor_profile.take().unwrap_or_default();
        patch.apply(&mut profile);
        self.role = Role::Advisor;
        self.advisor_profile = Some(profile);
        self.updated_at = now;
    }
}

/// Everything needed to insert a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub advisor_profile: Option<AdvisorProfile>,
    pub password_hash: String,
    pub verification_token: Option<String>,
}

// Only used internally for login and password management - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub verification_token: Option<String>,
    pub reset_token: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[validate(
        length(max = 100, message = "Name must be between 1 and 100 characters"),
        custom(function = "not_blank", message = "Name is required")
    )]
    pub name: Option<String>,
    #[validate(length(max = 30, message = "Phone number is too long"))]
    pub phone: Option<String>,
}

impl UserPatch {
    pub fn apply(self, user: &mut User, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            user.name = name.trim().to_string();
        }
        if let Some(phone) = self.phone {
            let phone = phone.trim().to_string();
            user.phone = (!phone.is_empty()).then_some(phone);
        }
        user.updated_at = now;
    }
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorProfilePatch {
    #[validate(length(max = 2000, message = "Bio is too long"))]
    pub bio: Option<String>,
    #[validate(length(max = 20, message = "At most 20 specializations are allowed"))]
    pub specializations: Option<Vec<String>>,
    #[validate(range(min = 0.0, message = "Hourly rate cannot be negative"))]
    pub hourly_rate: Option<f64>,
    pub availability: Option<Availability>,
    #[validate(range(max = 80, message = "Years of experience is out of range"))]
    pub years_of_experience: Option<u32>,
}

impl AdvisorProfilePatch {
    pub fn apply(self, profile: &mut AdvisorProfile) {
        if let Some(bio) = self.bio {
            profile.bio = bio.trim().to_string();
        }
        if let Some(specializations) = self.specializations {
            let mut cleaned: Vec<String> = Vec::with_capacity(specializations.len());
            for s in specializations {
                let s = s.trim().to_string();
                if !s.is_empty() && !cleaned.iter().any(|c| c.eq_ignore_ascii_case(&s)) {
                    cleaned.push(s);
                }
            }
            profile.specializations = cleaned;
        }
        if let Some(rate) = self.hourly_rate {
            profile.hourly_rate = rate;
        }
        if let Some(availability) = self.availability {
            profile.availability = availability;
        }
        if let Some(years) = self.years_of_experience {
            profile.years_of_experience = years;
        }
    }
}

//=========================================================================================
// Connection Requests (client -> advisor pairing)
//=========================================================================================

text_enum! {
    pub enum ConnectionStatus {
        Pending => "pending",
        Accepted => "accepted",
        Rejected => "rejected",
    }
}

/// A client's request to be paired with a specific advisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub advisor_id: Uuid,
    pub message: Option<String>,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl ConnectionRequest {
    pub fn new(user_id: Uuid, advisor_id: Uuid, message: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            advisor_id,
            message: message
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            status: ConnectionStatus::Pending,
            created_at: now,
            responded_at: None,
        }
    }
}

//=========================================================================================
// Advice Requests
//=========================================================================================

text_enum! {
    /// Lifecycle of an advice request. See [`crate::workflow`] for the allowed moves.
    pub enum RequestStatus {
        Pending => "Pending",
        Accepted => "Accepted",
        Declined => "Declined",
        InProgress => "In Progress",
        Completed => "Completed",
        Closed => "Closed",
        Cancelled => "Cancelled",
    }
}

impl RequestStatus {
    /// Whether messages may be exchanged and meetings scheduled in this state.
    pub fn is_open(&self) -> bool {
        matches!(self, RequestStatus::Accepted | RequestStatus::InProgress)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Declined
                | RequestStatus::Completed
                | RequestStatus::Closed
                | RequestStatus::Cancelled
        )
    }
}

/// Which side of an advice request a user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participant {
    Client,
    Advisor,
}

/// A client's request for financial guidance, answered by one advisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviceRequest {
    pub id: Uuid,
    pub client_id: Uuid,
    pub advisor_id: Uuid,
    pub topic: String,
    pub description: String,
    pub budget: Option<String>,
    pub status: RequestStatus,
    pub draft_response: Option<String>,
    pub deleted_by_client: bool,
    pub deleted_by_advisor: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdviceRequest {
    pub fn new(client_id: Uuid, draft: NewAdviceRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            advisor_id: draft.advisor_id,
            topic: draft.topic.trim().to_string(),
            description: draft.description.trim().to_string(),
            budget: draft
                .budget
                .map(|b| b.trim().to_string())
                .filter(|b| !b.is_empty()),
            status: RequestStatus::Pending,
            draft_response: None,
            deleted_by_client: false,
            deleted_by_advisor: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn participant(&self, user_id: Uuid) -> Option<Participant> {
        if user_id == self.client_id {
            Some(Participant::Client)
        } else if user_id == self.advisor_id {
            Some(Participant::Advisor)
        } else {
            None
        }
    }

    /// The other side of the conversation for `user_id`.
    pub fn counterpart(&self, user_id: Uuid) -> Uuid {
        if user_id == self.client_id {
            self.advisor_id
        } else {
            self.client_id
        }
    }

    /// True when `user_id` has soft-deleted the request from their side.
    pub fn is_hidden_from(&self, user_id: Uuid) -> bool {
        (user_id == self.client_id && self.deleted_by_client)
            || (user_id == self.advisor_id && self.deleted_by_advisor)
    }

    /// Marks the request deleted for `side`. Returns true once both sides have deleted it.
    pub fn soft_delete(&mut self, side: Participant, now: DateTime<Utc>) -> bool {
        match side {
            Participant::Client => self.deleted_by_client = true,
            Participant::Advisor => self.deleted_by_advisor = true,
        }
        self.updated_at = now;
        self.deleted_by_client && self.deleted_by_advisor
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewAdviceRequest {
    pub advisor_id: Uuid,
    #[validate(
        length(max = 200, message = "Topic must be between 1 and 200 characters"),
        custom(function = "not_blank", message = "Topic is required")
    )]
    pub topic: String,
    #[validate(
        length(max = 5000, message = "Description must be between 1 and 5000 characters"),
        custom(function = "not_blank", message = "Description is required")
    )]
    pub description: String,
    #[validate(length(max = 100, message = "Budget is too long"))]
    pub budget: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdviceRequestPatch {
    #[validate(
        length(max = 200, message = "Topic must be between 1 and 200 characters"),
        custom(function = "not_blank", message = "Topic is required")
    )]
    pub topic: Option<String>,
    #[validate(
        length(max = 5000, message = "Description must be between 1 and 5000 characters"),
        custom(function = "not_blank", message = "Description is required")
    )]
    pub description: Option<String>,
    #[validate(length(max = 100, message = "Budget is too long"))]
    pub budget: Option<String>,
}

impl AdviceRequestPatch {
    pub fn apply(self, request: &mut AdviceRequest, now: DateTime<Utc>) {
        if let Some(topic) = self.topic {
            request.topic = topic.trim().to_string();
        }
        if let Some(description) = self.description {
            request.description = description.trim().to_string();
        }
        if let Some(budget) = self.budget {
            let budget = budget.trim().to_string();
            request.budget = (!budget.is_empty()).then_some(budget);
        }
        request.updated_at = now;
    }
}

//=========================================================================================
// Conversation artefacts: messages, private notes, meetings
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub request_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn new(request_id: Uuid, sender_id: Uuid, content: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            sender_id,
            content: content.trim().to_string(),
            read: false,
            created_at: now,
            edited_at: None,
        }
    }
}

/// A note a participant keeps on a request. Only its author ever sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub request_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(request_id: Uuid, author_id: Uuid, content: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            author_id,
            content: content.trim().to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

text_enum! {
    pub enum MeetingStatus {
        Scheduled => "Scheduled",
        Completed => "Completed",
        Cancelled => "Cancelled",
    }
}

pub const DEFAULT_MEETING_MINUTES: u32 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: Uuid,
    pub request_id: Uuid,
    pub client_id: Uuid,
    pub advisor_id: Uuid,
    pub date_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub location: Option<String>,
    pub agenda: Option<String>,
    pub status: MeetingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meeting {
    pub fn new(request: &AdviceRequest, draft: NewMeeting, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id: request.id,
            client_id: request.client_id,
            advisor_id: request.advisor_id,
            date_time: draft.date_time,
            duration_minutes: draft.duration_minutes.unwrap_or(DEFAULT_MEETING_MINUTES),
            location: non_blank(draft.location),
            agenda: non_blank(draft.agenda),
            status: MeetingStatus::Scheduled,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        user_id == self.client_id || user_id == self.advisor_id
    }

    pub fn counterpart(&self, user_id: Uuid) -> Uuid {
        if user_id == self.client_id {
            self.advisor_id
        } else {
            self.client_id
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewMeeting {
    pub request_id: Uuid,
    pub date_time: DateTime<Utc>,
    #[validate(range(min = 15, max = 480, message = "Duration must be between 15 and 480 minutes"))]
    pub duration_minutes: Option<u32>,
    #[validate(length(max = 500, message = "Location is too long"))]
    pub location: Option<String>,
    #[validate(length(max = 2000, message = "Agenda is too long"))]
    pub agenda: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MeetingPatch {
    pub date_time: Option<DateTime<Utc>>,
    #[validate(range(min = 15, max = 480, message = "Duration must be between 15 and 480 minutes"))]
    pub duration_minutes: Option<u32>,
    #[validate(length(max = 500, message = "Location is too long"))]
    pub location: Option<String>,
    #[validate(length(max = 2000, message = "Agenda is too long"))]
    pub agenda: Option<String>,
}

impl MeetingPatch {
    pub fn apply(self, meeting: &mut Meeting, now: DateTime<Utc>) {
        if let Some(date_time) = self.date_time {
            meeting.date_time = date_time;
        }
        if let Some(minutes) = self.duration_minutes {
            meeting.duration_minutes = minutes;
        }
        if self.location.is_some() {
            meeting.location = non_blank(self.location);
        }
        if self.agenda.is_some() {
            meeting.agenda = non_blank(self.agenda);
        }
        meeting.updated_at = now;
    }
}

//=========================================================================================
// Settings
//=========================================================================================

text_enum! {
    pub enum Theme {
        Light => "light",
        Dark => "dark",
        System => "system",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub user_id: Uuid,
    pub currency: String,
    pub language: String,
    pub theme: Theme,
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub budget_alerts: bool,
    pub updated_at: DateTime<Utc>,
}

impl UserSettings {
    pub fn defaults(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            currency: "SAR".to_string(),
            language: "en".to_string(),
            theme: Theme::System,
            email_notifications: true,
            push_notifications: true,
            budget_alerts: true,
            updated_at: now,
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
    #[validate(length(min = 2, max = 10, message = "Language must be a language tag"))]
    pub language: Option<String>,
    pub theme: Option<Theme>,
    pub email_notifications: Option<bool>,
    pub push_notifications: Option<bool>,
    pub budget_alerts: Option<bool>,
}

impl SettingsPatch {
    pub fn apply(self, settings: &mut UserSettings, now: DateTime<Utc>) {
        if let Some(currency) = self.currency {
            settings.currency = currency.to_uppercase();
        }
        if let Some(language) = self.language {
            settings.language = language;
        }
        if let Some(theme) = self.theme {
            settings.theme = theme;
        }
        if let Some(flag) = self.email_notifications {
            settings.email_notifications = flag;
        }
        if let Some(flag) = self.push_notifications {
            settings.push_notifications = flag;
        }
        if let Some(flag) = self.budget_alerts {
            settings.budget_alerts = flag;
        }
        settings.updated_at = now;
    }
}

//=========================================================================================
// Notifications
//=========================================================================================

text_enum! {
    pub enum NotificationKind {
        Message => "message",
        Request => "request",
        Connection => "connection",
        Meeting => "meeting",
        System => "system",
        Announcement => "announcement",
    }
}

text_enum! {
    /// The recipients of an admin broadcast.
    pub enum Audience {
        All => "all",
        Advisors => "advisors",
        Clients => "clients",
    }
}

impl Audience {
    /// The role filter that selects this audience; `None` means every account.
    pub fn role(&self) -> Option<Role> {
        match self {
            Audience::All => None,
            Audience::Advisors => Some(Role::Advisor),
            Audience::Clients => Some(Role::User),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        link: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            link,
            read: false,
            created_at: now,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(role: Role) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: "Sara".to_string(),
            email: "sara@example.com".to_string(),
            role,
            phone: None,
            email_verified: false,
            advisor_profile: None,
            connected_advisor: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn become_advisor_fills_defaults_for_omitted_fields() {
        let mut user = sample_user(Role::User);
        let patch = AdvisorProfilePatch {
            bio: Some("  Retirement planning  ".to_string()),
            ..Default::default()
        };
        user.become_advisor(patch, Utc::now());

        assert_eq!(user.role, Role::Advisor);
        let profile = user.advisor_profile.expect("profile is set");
        assert_eq!(profile.bio, "Retirement planning");
        assert!(profile.specializations.is_empty());
        assert_eq!(profile.hourly_rate, 0.0);
        assert_eq!(profile.availability, Availability::Available);
    }

    #[test]
    fn become_advisor_keeps_existing_profile_fields() {
        let mut user = sample_user(Role::Advisor);
        user.advisor_profile = Some(AdvisorProfile {
            hourly_rate: 250.0,
            ..Default::default()
        });
        let patch = AdvisorProfilePatch {
            availability: Some(Availability::Busy),
            ..Default::default()
        };
        user.become_advisor(patch, Utc::now());

        let profile = user.advisor_profile.expect("profile is set");
        assert_eq!(profile.hourly_rate, 250.0);
        assert_eq!(profile.availability, Availability::Busy);
    }

    #[test]
    fn specializations_are_trimmed_and_deduplicated() {
        let mut profile = AdvisorProfile::default();
        AdvisorProfilePatch {
            specializations: Some(vec![
                " Tax ".to_string(),
                "tax".to_string(),
                "".to_string(),
                "Islamic Finance".to_string(),
            ]),
            ..Default::default()
        }
        .apply(&mut profile);

        assert_eq!(profile.specializations, vec!["Tax", "Islamic Finance"]);
        assert!(profile.specializes_in("islamic"));
        assert!(!profile.specializes_in("crypto"));
    }

    #[test]
    fn text_enums_use_their_wire_names() {
        assert_eq!(RequestStatus::InProgress.as_str(), "In Progress");
        assert_eq!("In Progress".parse::<RequestStatus>(), Ok(RequestStatus::InProgress));
        assert!("in progress".parse::<RequestStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&ConnectionStatus::Accepted).unwrap(),
            "\"accepted\""
        );
    }

    #[test]
    fn soft_delete_reports_when_both_sides_are_gone() {
        let now = Utc::now();
        let draft = NewAdviceRequest {
            advisor_id: Uuid::new_v4(),
            topic: "Savings".to_string(),
            description: "How much should I save?".to_string(),
            budget: Some("   ".to_string()),
        };
        let mut request = AdviceRequest::new(Uuid::new_v4(), draft, now);
        assert_eq!(request.budget, None);

        assert!(!request.soft_delete(Participant::Client, now));
        assert!(request.is_hidden_from(request.client_id));
        assert!(!request.is_hidden_from(request.advisor_id));
        assert!(request.soft_delete(Participant::Advisor, now));
    }

    #[test]
    fn clearing_phone_with_blank_string() {
        let mut user = sample_user(Role::User);
        user.phone = Some("0500000000".to_string());
        UserPatch {
            name: None,
            phone: Some(" ".to_string()),
        }
        .apply(&mut user, Utc::now());
        assert_eq!(user.phone, None);
    }
}
