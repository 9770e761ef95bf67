use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;
pub type SharedDatabase = Arc<dyn Database>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(e) => match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => Ok(()),
                e => Err(e),
            },
        }
    }
}

/// Represents a type that can fetch and store hub data
#[async_trait]
pub trait Database: Send + Sync {
    /// Returns Ok if the store is reachable. Used by the health endpoint.
    async fn check_connection(&self) -> Result<()>;

    async fn has_admin(&self) -> Result<bool>;
    async fn user_by_id(&self, user_id: &str) -> Result<UserData>;
    async fn user_by_email(&self, email: &str) -> Result<UserData>;
    async fn list_users_by_role(&self, role: Role) -> Result<Vec<UserData>>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;
    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData>;
    async fn set_user_role(&self, user_id: &str, role: Role) -> Result<UserData>;
    async fn delete_user(&self, user_id: &str) -> Result<()>;

    async fn session_by_token(&self, token: &str) -> Result<AuthSessionData>;
    async fn create_session(&self, new_session: NewAuthSession) -> Result<AuthSessionData>;
    async fn delete_session_by_token(&self, token: &str) -> Result<()>;
    /// Removes expired sessions, returning how many were removed
    async fn clear_expired_sessions(&self) -> Result<u64>;

    async fn booking_by_id(&self, booking_id: PrimaryKey) -> Result<BookingData>;
    async fn create_booking(&self, new_booking: NewBooking) -> Result<BookingData>;
    async fn update_booking(&self, updated_booking: UpdatedBooking) -> Result<BookingData>;
    async fn bookings_by_student(&self, student_id: &str) -> Result<Vec<BookingData>>;
    async fn bookings_by_counsellor(&self, counsellor_id: &str) -> Result<Vec<BookingData>>;
    async fn bookings_by_status(&self, status: BookingStatus) -> Result<Vec<BookingData>>;
    async fn list_bookings(&self) -> Result<Vec<BookingData>>;

    async fn resource_by_id(&self, resource_id: PrimaryKey) -> Result<ResourceData>;
    /// Lists active resources only
    async fn list_resources(&self) -> Result<Vec<ResourceData>>;
    async fn create_resource(&self, new_resource: NewResource) -> Result<ResourceData>;
    async fn update_resource(&self, updated_resource: UpdatedResource) -> Result<ResourceData>;
    async fn deactivate_resource(&self, resource_id: PrimaryKey) -> Result<ResourceData>;

    async fn message_by_id(&self, message_id: PrimaryKey) -> Result<MessageData>;
    async fn create_message(&self, new_message: NewMessage) -> Result<MessageData>;
    /// All messages between the two users, oldest first
    async fn conversation(&self, user_a: &str, user_b: &str) -> Result<Vec<MessageData>>;
    /// All messages the user sent or received, newest first
    async fn messages_for_user(&self, user_id: &str) -> Result<Vec<MessageData>>;
    async fn mark_message_read(&self, message_id: PrimaryKey) -> Result<MessageData>;

    async fn progress_for_user(&self, user_id: &str) -> Result<Vec<ProgressData>>;
    /// Inserts or updates the row for `(user_id, resource_id)` in one step
    async fn upsert_progress(&self, new_progress: NewProgress) -> Result<ProgressData>;

    async fn stats(&self) -> Result<StatsData>;
}

#[derive(Debug)]
pub struct NewUser {
    pub id: UserId,
    pub email: String,
    /// Hashed before it gets here
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

#[derive(Debug)]
pub struct UpdatedUser {
    pub id: UserId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug)]
pub struct NewAuthSession {
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewBooking {
    pub student_id: UserId,
    pub counsellor_id: UserId,
    pub scheduled_at: DateTime<Utc>,
    pub kind: BookingKind,
    pub notes: Option<String>,
}

#[derive(Debug, Default)]
pub struct UpdatedBooking {
    pub id: PrimaryKey,
    pub status: Option<BookingStatus>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub student_notes: Option<String>,
}

#[derive(Debug)]
pub struct NewResource {
    pub title: String,
    pub description: String,
    pub kind: ResourceKind,
    pub file_url: String,
    pub duration: Option<i32>,
    /// The uploader of the new resource
    pub uploaded_by: UserId,
}

#[derive(Debug, Default)]
pub struct UpdatedResource {
    pub id: PrimaryKey,
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<ResourceKind>,
    pub file_url: Option<String>,
    pub duration: Option<i32>,
}

#[derive(Debug)]
pub struct NewMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
}

#[derive(Debug)]
pub struct NewProgress {
    pub user_id: UserId,
    pub resource_id: PrimaryKey,
    pub progress: i32,
}
