use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, query, query_as, query_scalar, Error as SqlxError, FromRow, PgPool};

use crate::{
    AuthSessionData, BookingData, BookingKind, BookingStatus, Database, DatabaseError,
    DatabaseResult, IntoDatabaseError, MessageData, MessageStatus, NewAuthSession, NewBooking,
    NewMessage, NewProgress, NewResource, NewUser, PrimaryKey, ProgressData, ResourceData,
    ResourceKind, Result, Role, StatsData, UpdatedBooking, UpdatedResource, UpdatedUser, UserData,
};

/// A postgres database implementation for the hub
pub struct PgDatabase {
    pool: PgPool,
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    email: String,
    first_name: String,
    last_name: String,
    role: String,
    password: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct SessionRow {
    id: PrimaryKey,
    token: String,
    user_id: String,
    expires_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct BookingRow {
    id: PrimaryKey,
    student_id: String,
    counsellor_id: String,
    scheduled_at: DateTime<Utc>,
    status: String,
    kind: String,
    notes: Option<String>,
    student_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ResourceRow {
    id: PrimaryKey,
    title: String,
    description: String,
    kind: String,
    file_url: String,
    duration: Option<i32>,
    uploaded_by: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct MessageRow {
    id: PrimaryKey,
    sender_id: String,
    receiver_id: String,
    content: String,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ProgressRow {
    id: PrimaryKey,
    user_id: String,
    resource_id: PrimaryKey,
    progress: i32,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// A stored enum value the application doesn't recognize
fn corrupt(resource: &'static str, field: &'static str, value: &str) -> DatabaseError {
    DatabaseError::Internal(format!("{resource} has an unknown {field} of {value}").into())
}

impl UserRow {
    fn into_data(self) -> Result<UserData> {
        let role = Role::parse(&self.role).ok_or_else(|| corrupt("user", "role", &self.role))?;

        Ok(UserData {
            id: self.id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            role,
            password: self.password,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl MessageRow {
    fn into_data(self) -> Result<MessageData> {
        let status = MessageStatus::parse(&self.status)
            .ok_or_else(|| corrupt("message", "status", &self.status))?;

        Ok(MessageData {
            id: self.id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            content: self.content,
            status,
            created_at: self.created_at,
        })
    }
}

impl ProgressRow {
    fn into_data(self) -> ProgressData {
        ProgressData {
            id: self.id,
            user_id: self.user_id,
            resource_id: self.resource_id,
            progress: self.progress,
            completed_at: self.completed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }

    async fn hydrate_booking(&self, row: BookingRow) -> Result<BookingData> {
        let status = BookingStatus::parse(&row.status)
            .ok_or_else(|| corrupt("booking", "status", &row.status))?;
        let kind =
            BookingKind::parse(&row.kind).ok_or_else(|| corrupt("booking", "kind", &row.kind))?;

        let student = self.user_by_id(&row.student_id).await?;
        let counsellor = self.user_by_id(&row.counsellor_id).await?;

        Ok(BookingData {
            id: row.id,
            student,
            counsellor,
            scheduled_at: row.scheduled_at,
            status,
            kind,
            notes: row.notes,
            student_notes: row.student_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn hydrate_bookings(&self, rows: Vec<BookingRow>) -> Result<Vec<BookingData>> {
        let mut bookings = Vec::with_capacity(rows.len());

        for row in rows {
            bookings.push(self.hydrate_booking(row).await?);
        }

        Ok(bookings)
    }

    async fn hydrate_resource(&self, row: ResourceRow) -> Result<ResourceData> {
        let kind = ResourceKind::parse(&row.kind)
            .ok_or_else(|| corrupt("resource", "kind", &row.kind))?;

        let uploaded_by = self.user_by_id(&row.uploaded_by).await?;

        Ok(ResourceData {
            id: row.id,
            title: row.title,
            description: row.description,
            kind,
            file_url: row.file_url,
            duration: row.duration,
            uploaded_by,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn check_connection(&self) -> Result<()> {
        query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn has_admin(&self) -> Result<bool> {
        let result = query("SELECT id FROM users WHERE role = 'admin'")
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => match e {
                SqlxError::RowNotFound => Ok(false),
                e => Err(e.any()),
            },
        }
    }

    async fn user_by_id(&self, user_id: &str) -> Result<UserData> {
        query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "id"))?
            .into_data()
    }

    async fn user_by_email(&self, email: &str) -> Result<UserData> {
        query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "email"))?
            .into_data()
    }

    async fn list_users_by_role(&self, role: Role) -> Result<Vec<UserData>> {
        query_as::<_, UserRow>("SELECT * FROM users WHERE role = $1 ORDER BY last_name, first_name")
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?
            .into_iter()
            .map(UserRow::into_data)
            .collect()
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        self.user_by_email(&new_user.email)
            .await
            .conflict_or_ok("user", "email", &new_user.email)?;

        query_as::<_, UserRow>(
            "INSERT INTO users (id, email, password, first_name, last_name, role)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(&new_user.id)
        .bind(&new_user.email)
        .bind(&new_user.password)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(new_user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?
        .into_data()
    }

    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData> {
        let user = self.user_by_id(&updated_user.id).await?;

        query(
            "UPDATE users SET first_name = $1, last_name = $2, updated_at = now() WHERE id = $3",
        )
        .bind(updated_user.first_name.unwrap_or(user.first_name))
        .bind(updated_user.last_name.unwrap_or(user.last_name))
        .bind(&updated_user.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.user_by_id(&updated_user.id).await
    }

    async fn set_user_role(&self, user_id: &str, role: Role) -> Result<UserData> {
        // Ensure user exists
        let _ = self.user_by_id(user_id).await?;

        query("UPDATE users SET role = $1, updated_at = now() WHERE id = $2")
            .bind(role.as_str())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.user_by_id(user_id).await
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        // Ensure user exists
        let _ = self.user_by_id(user_id).await?;

        query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn session_by_token(&self, token: &str) -> Result<AuthSessionData> {
        let row = query_as::<_, SessionRow>("SELECT * FROM auth_sessions WHERE token = $1")
            .bind(token)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("session", "token"))?;

        let user = self.user_by_id(&row.user_id).await?;

        Ok(AuthSessionData {
            id: row.id,
            token: row.token,
            user,
            expires_at: row.expires_at,
        })
    }

    async fn create_session(&self, new_session: NewAuthSession) -> Result<AuthSessionData> {
        self.session_by_token(&new_session.token)
            .await
            .conflict_or_ok("session", "token", &new_session.token)?;

        let row = query_as::<_, SessionRow>(
            "INSERT INTO auth_sessions (token, user_id, expires_at)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(&new_session.token)
        .bind(&new_session.user_id)
        .bind(new_session.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.session_by_token(&row.token).await
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        // Ensure session exists
        let _ = self.session_by_token(token).await?;

        query("DELETE FROM auth_sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn clear_expired_sessions(&self) -> Result<u64> {
        query("DELETE FROM auth_sessions WHERE expires_at < timezone('UTC', now())")
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|r| r.rows_affected())
    }

    async fn booking_by_id(&self, booking_id: PrimaryKey) -> Result<BookingData> {
        let row = query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("booking", "id"))?;

        self.hydrate_booking(row).await
    }

    async fn create_booking(&self, new_booking: NewBooking) -> Result<BookingData> {
        // Ensure both participants exist
        let student = self.user_by_id(&new_booking.student_id).await?;
        let counsellor = self.user_by_id(&new_booking.counsellor_id).await?;

        let row = query_as::<_, BookingRow>(
            "INSERT INTO bookings (student_id, counsellor_id, scheduled_at, status, kind, notes)
             VALUES ($1, $2, $3, 'pending', $4, $5)
             RETURNING *",
        )
        .bind(&student.id)
        .bind(&counsellor.id)
        .bind(new_booking.scheduled_at)
        .bind(new_booking.kind.as_str())
        .bind(&new_booking.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.hydrate_booking(row).await
    }

    async fn update_booking(&self, updated_booking: UpdatedBooking) -> Result<BookingData> {
        let booking = self.booking_by_id(updated_booking.id).await?;

        query(
            "UPDATE bookings SET
                status = $1,
                scheduled_at = $2,
                notes = $3,
                student_notes = $4,
                updated_at = now()
            WHERE id = $5",
        )
        .bind(updated_booking.status.unwrap_or(booking.status).as_str())
        .bind(updated_booking.scheduled_at.unwrap_or(booking.scheduled_at))
        .bind(updated_booking.notes.or(booking.notes))
        .bind(updated_booking.student_notes.or(booking.student_notes))
        .bind(updated_booking.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.booking_by_id(updated_booking.id).await
    }

    async fn bookings_by_student(&self, student_id: &str) -> Result<Vec<BookingData>> {
        let rows = query_as::<_, BookingRow>(
            "SELECT * FROM bookings WHERE student_id = $1 ORDER BY scheduled_at",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.hydrate_bookings(rows).await
    }

    async fn bookings_by_counsellor(&self, counsellor_id: &str) -> Result<Vec<BookingData>> {
        let rows = query_as::<_, BookingRow>(
            "SELECT * FROM bookings WHERE counsellor_id = $1 ORDER BY scheduled_at",
        )
        .bind(counsellor_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.hydrate_bookings(rows).await
    }

    async fn bookings_by_status(&self, status: BookingStatus) -> Result<Vec<BookingData>> {
        let rows = query_as::<_, BookingRow>(
            "SELECT * FROM bookings WHERE status = $1 ORDER BY scheduled_at",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.hydrate_bookings(rows).await
    }

    async fn list_bookings(&self) -> Result<Vec<BookingData>> {
        let rows = query_as::<_, BookingRow>("SELECT * FROM bookings ORDER BY scheduled_at")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.hydrate_bookings(rows).await
    }

    async fn resource_by_id(&self, resource_id: PrimaryKey) -> Result<ResourceData> {
        let row = query_as::<_, ResourceRow>("SELECT * FROM resources WHERE id = $1")
            .bind(resource_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("resource", "id"))?;

        self.hydrate_resource(row).await
    }

    async fn list_resources(&self) -> Result<Vec<ResourceData>> {
        let rows = query_as::<_, ResourceRow>(
            "SELECT * FROM resources WHERE is_active = true ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let mut resources = Vec::with_capacity(rows.len());

        for row in rows {
            resources.push(self.hydrate_resource(row).await?);
        }

        Ok(resources)
    }

    async fn create_resource(&self, new_resource: NewResource) -> Result<ResourceData> {
        // Ensure the uploader exists
        let uploader = self.user_by_id(&new_resource.uploaded_by).await?;

        let row = query_as::<_, ResourceRow>(
            "INSERT INTO resources (title, description, kind, file_url, duration, uploaded_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(&new_resource.title)
        .bind(&new_resource.description)
        .bind(new_resource.kind.as_str())
        .bind(&new_resource.file_url)
        .bind(new_resource.duration)
        .bind(&uploader.id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.hydrate_resource(row).await
    }

    async fn update_resource(&self, updated_resource: UpdatedResource) -> Result<ResourceData> {
        let resource = self.resource_by_id(updated_resource.id).await?;

        query(
            "UPDATE resources SET
                title = $1,
                description = $2,
                kind = $3,
                file_url = $4,
                duration = $5,
                updated_at = now()
            WHERE id = $6",
        )
        .bind(updated_resource.title.unwrap_or(resource.title))
        .bind(updated_resource.description.unwrap_or(resource.description))
        .bind(updated_resource.kind.unwrap_or(resource.kind).as_str())
        .bind(updated_resource.file_url.unwrap_or(resource.file_url))
        .bind(updated_resource.duration.or(resource.duration))
        .bind(updated_resource.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.resource_by_id(updated_resource.id).await
    }

    async fn deactivate_resource(&self, resource_id: PrimaryKey) -> Result<ResourceData> {
        // Ensure resource exists
        let _ = self.resource_by_id(resource_id).await?;

        query("UPDATE resources SET is_active = false, updated_at = now() WHERE id = $1")
            .bind(resource_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.resource_by_id(resource_id).await
    }

    async fn message_by_id(&self, message_id: PrimaryKey) -> Result<MessageData> {
        query_as::<_, MessageRow>("SELECT * FROM messages WHERE id = $1")
            .bind(message_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("message", "id"))?
            .into_data()
    }

    async fn create_message(&self, new_message: NewMessage) -> Result<MessageData> {
        query_as::<_, MessageRow>(
            "INSERT INTO messages (sender_id, receiver_id, content, status)
             VALUES ($1, $2, $3, 'sent')
             RETURNING *",
        )
        .bind(&new_message.sender_id)
        .bind(&new_message.receiver_id)
        .bind(&new_message.content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?
        .into_data()
    }

    async fn conversation(&self, user_a: &str, user_b: &str) -> Result<Vec<MessageData>> {
        query_as::<_, MessageRow>(
            "SELECT * FROM messages
             WHERE (sender_id = $1 AND receiver_id = $2)
                OR (sender_id = $2 AND receiver_id = $1)
             ORDER BY created_at",
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?
        .into_iter()
        .map(MessageRow::into_data)
        .collect()
    }

    async fn messages_for_user(&self, user_id: &str) -> Result<Vec<MessageData>> {
        query_as::<_, MessageRow>(
            "SELECT * FROM messages
             WHERE sender_id = $1 OR receiver_id = $1
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?
        .into_iter()
        .map(MessageRow::into_data)
        .collect()
    }

    async fn mark_message_read(&self, message_id: PrimaryKey) -> Result<MessageData> {
        // Ensure message exists
        let _ = self.message_by_id(message_id).await?;

        query("UPDATE messages SET status = 'read' WHERE id = $1")
            .bind(message_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.message_by_id(message_id).await
    }

    async fn progress_for_user(&self, user_id: &str) -> Result<Vec<ProgressData>> {
        let rows = query_as::<_, ProgressRow>(
            "SELECT * FROM user_progress WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(ProgressRow::into_data).collect())
    }

    async fn upsert_progress(&self, new_progress: NewProgress) -> Result<ProgressData> {
        let completed_at = (new_progress.progress >= 100).then(Utc::now);

        let row = query_as::<_, ProgressRow>(
            "INSERT INTO user_progress (user_id, resource_id, progress, completed_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id, resource_id) DO UPDATE SET
                progress = EXCLUDED.progress,
                completed_at = CASE
                    WHEN EXCLUDED.progress >= 100
                        THEN COALESCE(user_progress.completed_at, EXCLUDED.completed_at)
                    ELSE NULL
                END,
                updated_at = now()
             RETURNING *",
        )
        .bind(&new_progress.user_id)
        .bind(new_progress.resource_id)
        .bind(new_progress.progress)
        .bind(completed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(row.into_data())
    }

    async fn stats(&self) -> Result<StatsData> {
        let count = |sql: &'static str| {
            let pool = self.pool.clone();
            async move {
                query_scalar::<_, i64>(sql)
                    .fetch_one(&pool)
                    .await
                    .map_err(|e| e.any())
            }
        };

        Ok(StatsData {
            students: count("SELECT COUNT(*) FROM users WHERE role = 'student'").await?,
            counsellors: count("SELECT COUNT(*) FROM users WHERE role = 'counsellor'").await?,
            bookings: count("SELECT COUNT(*) FROM bookings").await?,
            pending_bookings: count("SELECT COUNT(*) FROM bookings WHERE status = 'pending'")
                .await?,
            completed_bookings: count("SELECT COUNT(*) FROM bookings WHERE status = 'completed'")
                .await?,
            active_resources: count("SELECT COUNT(*) FROM resources WHERE is_active = true")
                .await?,
            messages: count("SELECT COUNT(*) FROM messages").await?,
        })
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}
