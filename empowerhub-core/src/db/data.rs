use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The type used for generated primary keys in the database.
pub type PrimaryKey = i32;

/// The opaque id of a user.
pub type UserId = String;

/// What a user is on the platform, and with that, what they are allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Counsellor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Counsellor => "counsellor",
            Self::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "student" => Some(Self::Student),
            "counsellor" => Some(Self::Counsellor),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Where a booking is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// The legal edges of the booking state machine.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Confirmed, Self::Completed)
                | (Self::Confirmed, Self::Cancelled)
        )
    }

    /// Terminal states never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingKind {
    Individual,
    Group,
}

impl BookingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Group => "group",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "individual" => Some(Self::Individual),
            "group" => Some(Self::Group),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Worksheet,
    Video,
    Audio,
    Interactive,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Worksheet => "worksheet",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Interactive => "interactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "worksheet" => Some(Self::Worksheet),
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            "interactive" => Some(Self::Interactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Read,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Read => "read",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sent" => Some(Self::Sent),
            "read" => Some(Self::Read),
            _ => None,
        }
    }
}

macro_rules! display_as_str {
    ($($name:ident),*) => {
        $(
            impl Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

display_as_str!(Role, BookingStatus, BookingKind, ResourceKind, MessageStatus);

/// A hub account
#[derive(Debug, Clone)]
pub struct UserData {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    /// The PHC string of the user's password, salt included
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Login session data for authentication
#[derive(Debug, Clone)]
pub struct AuthSessionData {
    pub id: PrimaryKey,
    /// The session token, or key if you will
    pub token: String,
    /// The user that is logged in
    pub user: UserData,
    pub expires_at: DateTime<Utc>,
}

/// A counselling appointment between a student and a counsellor
#[derive(Debug, Clone)]
pub struct BookingData {
    pub id: PrimaryKey,
    pub student: UserData,
    pub counsellor: UserData,
    pub scheduled_at: DateTime<Utc>,
    pub status: BookingStatus,
    pub kind: BookingKind,
    /// Notes kept by the counsellor
    pub notes: Option<String>,
    /// Notes kept by the student
    pub student_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An educational asset, referenced by URL
#[derive(Debug, Clone)]
pub struct ResourceData {
    pub id: PrimaryKey,
    pub title: String,
    pub description: String,
    pub kind: ResourceKind,
    pub file_url: String,
    /// Length in seconds, where the kind has one
    pub duration: Option<i32>,
    pub uploaded_by: UserData,
    /// Deactivated resources are soft-deleted
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A direct message between two users
#[derive(Debug, Clone)]
pub struct MessageData {
    pub id: PrimaryKey,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

/// How far a user has gotten with a resource.
/// Note: `user_id` and `resource_id` are unique together.
#[derive(Debug, Clone)]
pub struct ProgressData {
    pub id: PrimaryKey,
    pub user_id: UserId,
    pub resource_id: PrimaryKey,
    /// Percentage between 0 and 100
    pub progress: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Platform-wide counters for the admin dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsData {
    pub students: i64,
    pub counsellors: i64,
    pub bookings: i64,
    pub pending_bookings: i64,
    pub completed_bookings: i64,
    pub active_resources: i64,
    pub messages: i64,
}
