use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::{
    AuthSessionData, BookingData, BookingKind, BookingStatus, Database, DatabaseError,
    DatabaseResult, MessageData, MessageStatus, NewAuthSession, NewBooking, NewMessage,
    NewProgress, NewResource, NewUser, PrimaryKey, ProgressData, ResourceData, ResourceKind,
    Result, Role, StatsData, UpdatedBooking, UpdatedResource, UpdatedUser, UserData, UserId,
};

/// An in-memory database implementation for the hub.
///
/// Backs tests and local development. The whole state sits behind one lock so
/// compound operations observe a consistent view.
#[derive(Default)]
pub struct MemoryDatabase {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    users: Vec<UserData>,
    sessions: Vec<SessionRecord>,
    bookings: Vec<BookingRecord>,
    resources: Vec<ResourceRecord>,
    messages: Vec<MessageData>,
    progress: Vec<ProgressData>,
    next_key: PrimaryKey,
}

struct SessionRecord {
    id: PrimaryKey,
    token: String,
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
struct BookingRecord {
    id: PrimaryKey,
    student_id: UserId,
    counsellor_id: UserId,
    scheduled_at: DateTime<Utc>,
    status: BookingStatus,
    kind: BookingKind,
    notes: Option<String>,
    student_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone)]
struct ResourceRecord {
    id: PrimaryKey,
    title: String,
    description: String,
    kind: ResourceKind,
    file_url: String,
    duration: Option<i32>,
    uploaded_by: UserId,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl State {
    fn next_key(&mut self) -> PrimaryKey {
        self.next_key += 1;
        self.next_key
    }

    fn user(&self, user_id: &str) -> Result<UserData> {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })
    }

    fn booking(&self, record: &BookingRecord) -> Result<BookingData> {
        Ok(BookingData {
            id: record.id,
            student: self.user(&record.student_id)?,
            counsellor: self.user(&record.counsellor_id)?,
            scheduled_at: record.scheduled_at,
            status: record.status,
            kind: record.kind,
            notes: record.notes.clone(),
            student_notes: record.student_notes.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    fn sorted_bookings<'a, I>(&self, records: I) -> Result<Vec<BookingData>>
    where
        I: Iterator<Item = &'a BookingRecord>,
    {
        let mut sorted: Vec<_> = records.collect();
        sorted.sort_by_key(|r| r.scheduled_at);

        sorted.into_iter().map(|r| self.booking(r)).collect()
    }

    fn resource(&self, record: &ResourceRecord) -> Result<ResourceData> {
        Ok(ResourceData {
            id: record.id,
            title: record.title.clone(),
            description: record.description.clone(),
            kind: record.kind,
            file_url: record.file_url.clone(),
            duration: record.duration,
            uploaded_by: self.user(&record.uploaded_by)?,
            is_active: record.is_active,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn check_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn has_admin(&self) -> Result<bool> {
        Ok(self
            .state
            .lock()
            .users
            .iter()
            .any(|u| u.role == Role::Admin))
    }

    async fn user_by_id(&self, user_id: &str) -> Result<UserData> {
        self.state.lock().user(user_id)
    }

    async fn user_by_email(&self, email: &str) -> Result<UserData> {
        self.state
            .lock()
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "email",
            })
    }

    async fn list_users_by_role(&self, role: Role) -> Result<Vec<UserData>> {
        let mut users: Vec<_> = self
            .state
            .lock()
            .users
            .iter()
            .filter(|u| u.role == role)
            .cloned()
            .collect();

        users.sort_by(|a, b| {
            (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name))
        });

        Ok(users)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        let mut state = self.state.lock();

        state
            .users
            .iter()
            .find(|u| u.email == new_user.email)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "email",
            })
            .conflict_or_ok("user", "email", &new_user.email)?;

        let now = Utc::now();
        let user = UserData {
            id: new_user.id,
            email: new_user.email,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            role: new_user.role,
            password: new_user.password,
            created_at: now,
            updated_at: now,
        };

        state.users.push(user.clone());

        Ok(user)
    }

    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData> {
        let mut state = self.state.lock();

        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == updated_user.id)
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })?;

        if let Some(first_name) = updated_user.first_name {
            user.first_name = first_name;
        }

        if let Some(last_name) = updated_user.last_name {
            user.last_name = last_name;
        }

        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn set_user_role(&self, user_id: &str, role: Role) -> Result<UserData> {
        let mut state = self.state.lock();

        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })?;

        user.role = role;
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        let mut state = self.state.lock();

        // Ensure user exists
        let _ = state.user(user_id)?;

        state.users.retain(|u| u.id != user_id);
        state.sessions.retain(|s| s.user_id != user_id);

        Ok(())
    }

    async fn session_by_token(&self, token: &str) -> Result<AuthSessionData> {
        let state = self.state.lock();

        let record = state
            .sessions
            .iter()
            .find(|s| s.token == token)
            .ok_or(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            })?;

        Ok(AuthSessionData {
            id: record.id,
            token: record.token.clone(),
            user: state.user(&record.user_id)?,
            expires_at: record.expires_at,
        })
    }

    async fn create_session(&self, new_session: NewAuthSession) -> Result<AuthSessionData> {
        let mut state = self.state.lock();

        if state.sessions.iter().any(|s| s.token == new_session.token) {
            return Err(DatabaseError::Conflict {
                resource: "session",
                field: "token",
                value: new_session.token,
            });
        }

        let user = state.user(&new_session.user_id)?;
        let id = state.next_key();

        state.sessions.push(SessionRecord {
            id,
            token: new_session.token.clone(),
            user_id: new_session.user_id,
            expires_at: new_session.expires_at,
        });

        Ok(AuthSessionData {
            id,
            token: new_session.token,
            user,
            expires_at: new_session.expires_at,
        })
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        let mut state = self.state.lock();

        if !state.sessions.iter().any(|s| s.token == token) {
            return Err(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            });
        }

        state.sessions.retain(|s| s.token != token);

        Ok(())
    }

    async fn clear_expired_sessions(&self) -> Result<u64> {
        let mut state = self.state.lock();
        let now = Utc::now();

        let before = state.sessions.len();
        state.sessions.retain(|s| s.expires_at >= now);

        Ok((before - state.sessions.len()) as u64)
    }

    async fn booking_by_id(&self, booking_id: PrimaryKey) -> Result<BookingData> {
        let state = self.state.lock();

        let record = state
            .bookings
            .iter()
            .find(|b| b.id == booking_id)
            .ok_or(DatabaseError::NotFound {
                resource: "booking",
                identifier: "id",
            })?;

        state.booking(record)
    }

    async fn create_booking(&self, new_booking: NewBooking) -> Result<BookingData> {
        let mut state = self.state.lock();

        // Ensure both participants exist
        let _ = state.user(&new_booking.student_id)?;
        let _ = state.user(&new_booking.counsellor_id)?;

        let now = Utc::now();
        let record = BookingRecord {
            id: state.next_key(),
            student_id: new_booking.student_id,
            counsellor_id: new_booking.counsellor_id,
            scheduled_at: new_booking.scheduled_at,
            status: BookingStatus::Pending,
            kind: new_booking.kind,
            notes: new_booking.notes,
            student_notes: None,
            created_at: now,
            updated_at: now,
        };

        let booking = state.booking(&record)?;
        state.bookings.push(record);

        Ok(booking)
    }

    async fn update_booking(&self, updated_booking: UpdatedBooking) -> Result<BookingData> {
        let mut state = self.state.lock();

        let record = state
            .bookings
            .iter_mut()
            .find(|b| b.id == updated_booking.id)
            .ok_or(DatabaseError::NotFound {
                resource: "booking",
                identifier: "id",
            })?;

        if let Some(status) = updated_booking.status {
            record.status = status;
        }

        if let Some(scheduled_at) = updated_booking.scheduled_at {
            record.scheduled_at = scheduled_at;
        }

        if let Some(notes) = updated_booking.notes {
            record.notes = Some(notes);
        }

        if let Some(student_notes) = updated_booking.student_notes {
            record.student_notes = Some(student_notes);
        }

        record.updated_at = Utc::now();

        let record = record.clone();
        state.booking(&record)
    }

    async fn bookings_by_student(&self, student_id: &str) -> Result<Vec<BookingData>> {
        let state = self.state.lock();
        state.sorted_bookings(state.bookings.iter().filter(|b| b.student_id == student_id))
    }

    async fn bookings_by_counsellor(&self, counsellor_id: &str) -> Result<Vec<BookingData>> {
        let state = self.state.lock();
        state.sorted_bookings(
            state
                .bookings
                .iter()
                .filter(|b| b.counsellor_id == counsellor_id),
        )
    }

    async fn bookings_by_status(&self, status: BookingStatus) -> Result<Vec<BookingData>> {
        let state = self.state.lock();
        state.sorted_bookings(state.bookings.iter().filter(|b| b.status == status))
    }

    async fn list_bookings(&self) -> Result<Vec<BookingData>> {
        let state = self.state.lock();
        state.sorted_bookings(state.bookings.iter())
    }

    async fn resource_by_id(&self, resource_id: PrimaryKey) -> Result<ResourceData> {
        let state = self.state.lock();

        let record = state
            .resources
            .iter()
            .find(|r| r.id == resource_id)
            .ok_or(DatabaseError::NotFound {
                resource: "resource",
                identifier: "id",
            })?;

        state.resource(record)
    }

    async fn list_resources(&self) -> Result<Vec<ResourceData>> {
        let state = self.state.lock();

        let mut records: Vec<_> = state.resources.iter().filter(|r| r.is_active).collect();
        records.sort_by_key(|r| std::cmp::Reverse(r.created_at));

        records.into_iter().map(|r| state.resource(r)).collect()
    }

    async fn create_resource(&self, new_resource: NewResource) -> Result<ResourceData> {
        let mut state = self.state.lock();

        // Ensure the uploader exists
        let _ = state.user(&new_resource.uploaded_by)?;

        let now = Utc::now();
        let record = ResourceRecord {
            id: state.next_key(),
            title: new_resource.title,
            description: new_resource.description,
            kind: new_resource.kind,
            file_url: new_resource.file_url,
            duration: new_resource.duration,
            uploaded_by: new_resource.uploaded_by,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let resource = state.resource(&record)?;
        state.resources.push(record);

        Ok(resource)
    }

    async fn update_resource(&self, updated_resource: UpdatedResource) -> Result<ResourceData> {
        let mut state = self.state.lock();

        let record = state
            .resources
            .iter_mut()
            .find(|r| r.id == updated_resource.id)
            .ok_or(DatabaseError::NotFound {
                resource: "resource",
                identifier: "id",
            })?;

        if let Some(title) = updated_resource.title {
            record.title = title;
        }

        if let Some(description) = updated_resource.description {
            record.description = description;
        }

        if let Some(kind) = updated_resource.kind {
            record.kind = kind;
        }

        if let Some(file_url) = updated_resource.file_url {
            record.file_url = file_url;
        }

        if let Some(duration) = updated_resource.duration {
            record.duration = Some(duration);
        }

        record.updated_at = Utc::now();

        let record = record.clone();
        state.resource(&record)
    }

    async fn deactivate_resource(&self, resource_id: PrimaryKey) -> Result<ResourceData> {
        let mut state = self.state.lock();

        let record = state
            .resources
            .iter_mut()
            .find(|r| r.id == resource_id)
            .ok_or(DatabaseError::NotFound {
                resource: "resource",
                identifier: "id",
            })?;

        record.is_active = false;
        record.updated_at = Utc::now();

        let record = record.clone();
        state.resource(&record)
    }

    async fn message_by_id(&self, message_id: PrimaryKey) -> Result<MessageData> {
        self.state
            .lock()
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "message",
                identifier: "id",
            })
    }

    async fn create_message(&self, new_message: NewMessage) -> Result<MessageData> {
        let mut state = self.state.lock();

        let message = MessageData {
            id: state.next_key(),
            sender_id: new_message.sender_id,
            receiver_id: new_message.receiver_id,
            content: new_message.content,
            status: MessageStatus::Sent,
            created_at: Utc::now(),
        };

        state.messages.push(message.clone());

        Ok(message)
    }

    async fn conversation(&self, user_a: &str, user_b: &str) -> Result<Vec<MessageData>> {
        let mut messages: Vec<_> = self
            .state
            .lock()
            .messages
            .iter()
            .filter(|m| {
                (m.sender_id == user_a && m.receiver_id == user_b)
                    || (m.sender_id == user_b && m.receiver_id == user_a)
            })
            .cloned()
            .collect();

        messages.sort_by_key(|m| (m.created_at, m.id));

        Ok(messages)
    }

    async fn messages_for_user(&self, user_id: &str) -> Result<Vec<MessageData>> {
        let mut messages: Vec<_> = self
            .state
            .lock()
            .messages
            .iter()
            .filter(|m| m.sender_id == user_id || m.receiver_id == user_id)
            .cloned()
            .collect();

        messages.sort_by_key(|m| std::cmp::Reverse((m.created_at, m.id)));

        Ok(messages)
    }

    async fn mark_message_read(&self, message_id: PrimaryKey) -> Result<MessageData> {
        let mut state = self.state.lock();

        let message = state
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(DatabaseError::NotFound {
                resource: "message",
                identifier: "id",
            })?;

        message.status = MessageStatus::Read;

        Ok(message.clone())
    }

    async fn progress_for_user(&self, user_id: &str) -> Result<Vec<ProgressData>> {
        let mut rows: Vec<_> = self
            .state
            .lock()
            .progress
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();

        rows.sort_by_key(|p| std::cmp::Reverse(p.updated_at));

        Ok(rows)
    }

    async fn upsert_progress(&self, new_progress: NewProgress) -> Result<ProgressData> {
        let mut state = self.state.lock();
        let now = Utc::now();

        let existing = state
            .progress
            .iter_mut()
            .find(|p| p.user_id == new_progress.user_id && p.resource_id == new_progress.resource_id);

        let row = match existing {
            Some(row) => {
                row.progress = new_progress.progress;
                row.completed_at = if new_progress.progress >= 100 {
                    row.completed_at.or(Some(now))
                } else {
                    None
                };
                row.updated_at = now;

                row.clone()
            }
            None => {
                let row = ProgressData {
                    id: state.next_key(),
                    user_id: new_progress.user_id,
                    resource_id: new_progress.resource_id,
                    progress: new_progress.progress,
                    completed_at: (new_progress.progress >= 100).then_some(now),
                    created_at: now,
                    updated_at: now,
                };

                state.progress.push(row.clone());

                row
            }
        };

        Ok(row)
    }

    async fn stats(&self) -> Result<StatsData> {
        let state = self.state.lock();

        let roles = |role: Role| state.users.iter().filter(|u| u.role == role).count() as i64;
        let statuses = |status: BookingStatus| {
            state.bookings.iter().filter(|b| b.status == status).count() as i64
        };

        Ok(StatsData {
            students: roles(Role::Student),
            counsellors: roles(Role::Counsellor),
            bookings: state.bookings.len() as i64,
            pending_bookings: statuses(BookingStatus::Pending),
            completed_bookings: statuses(BookingStatus::Completed),
            active_resources: state.resources.iter().filter(|r| r.is_active).count() as i64,
            messages: state.messages.len() as i64,
        })
    }
}
