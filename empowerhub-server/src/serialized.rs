//! All schemas that are exposed from endpoints are defined here
//! along with the conversions from core data

use chrono::{DateTime, Utc};
use empowerhub_core::{
    AuthSessionData, BookingData, ConversationData, MessageData, ProgressData, ResourceData,
    StatsData, UserData,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: String,
    email: String,
    first_name: String,
    last_name: String,
    role: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResult {
    user: User,
    message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    user: User,
    token: String,
    message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResult {
    message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    id: i32,
    student: User,
    counsellor: User,
    scheduled_at: DateTime<Utc>,
    status: String,
    #[serde(rename = "type")]
    kind: String,
    notes: Option<String>,
    student_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    id: i32,
    title: String,
    description: String,
    #[serde(rename = "type")]
    kind: String,
    file_url: String,
    duration: Option<i32>,
    uploaded_by: User,
    is_active: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    id: i32,
    sender_id: String,
    receiver_id: String,
    content: String,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    partner: User,
    last_message: Message,
    unread: u32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    id: i32,
    user_id: String,
    resource_id: i32,
    progress: i32,
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    students: i64,
    counsellors: i64,
    total_sessions: i64,
    pending_sessions: i64,
    completed_sessions: i64,
    active_resources: i64,
    messages: i64,
}

impl MessageResult {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role: self.role.as_str().to_string(),
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<RegisterResult> for UserData {
    fn to_serialized(&self) -> RegisterResult {
        RegisterResult {
            user: self.to_serialized(),
            message: "Registration successful".to_string(),
        }
    }
}

impl ToSerialized<LoginResult> for AuthSessionData {
    fn to_serialized(&self) -> LoginResult {
        LoginResult {
            user: self.user.to_serialized(),
            token: self.token.clone(),
            message: "Login successful".to_string(),
        }
    }
}

impl ToSerialized<Booking> for BookingData {
    fn to_serialized(&self) -> Booking {
        Booking {
            id: self.id,
            student: self.student.to_serialized(),
            counsellor: self.counsellor.to_serialized(),
            scheduled_at: self.scheduled_at,
            status: self.status.as_str().to_string(),
            kind: self.kind.as_str().to_string(),
            notes: self.notes.clone(),
            student_notes: self.student_notes.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl ToSerialized<Resource> for ResourceData {
    fn to_serialized(&self) -> Resource {
        Resource {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            kind: self.kind.as_str().to_string(),
            file_url: self.file_url.clone(),
            duration: self.duration,
            uploaded_by: self.uploaded_by.to_serialized(),
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<Message> for MessageData {
    fn to_serialized(&self) -> Message {
        Message {
            id: self.id,
            sender_id: self.sender_id.clone(),
            receiver_id: self.receiver_id.clone(),
            content: self.content.clone(),
            status: self.status.as_str().to_string(),
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<Conversation> for ConversationData {
    fn to_serialized(&self) -> Conversation {
        Conversation {
            partner: self.partner.to_serialized(),
            last_message: self.last_message.to_serialized(),
            unread: self.unread,
        }
    }
}

impl ToSerialized<Progress> for ProgressData {
    fn to_serialized(&self) -> Progress {
        Progress {
            id: self.id,
            user_id: self.user_id.clone(),
            resource_id: self.resource_id,
            progress: self.progress,
            completed_at: self.completed_at,
            updated_at: self.updated_at,
        }
    }
}

impl ToSerialized<Stats> for StatsData {
    fn to_serialized(&self) -> Stats {
        Stats {
            students: self.students,
            counsellors: self.counsellors,
            total_sessions: self.bookings,
            pending_sessions: self.pending_bookings,
            completed_sessions: self.completed_bookings,
            active_resources: self.active_resources,
            messages: self.messages,
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use empowerhub_core::{Role, UserData};

    use super::ToSerialized;

    #[test]
    fn passwords_never_serialize() {
        let user = UserData {
            id: "u1".to_string(),
            email: "alice@example.com".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Example".to_string(),
            role: Role::Student,
            password: "$argon2id$v=19$secret".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let serialized: super::User = user.to_serialized();
        let json = serde_json::to_string(&serialized).expect("serializes");

        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
        assert!(json.contains("\"role\":\"student\""));
        assert!(json.contains("\"firstName\":\"Alice\""));
    }
}
