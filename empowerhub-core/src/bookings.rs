use chrono::{DateTime, Utc};
use log::warn;
use thiserror::Error;

use crate::{
    access::{can_perform, Action},
    BookingData, BookingKind, BookingStatus, DatabaseError, HubContext, NewBooking, Notification,
    PrimaryKey, Role, UpdatedBooking, UserData, UserId,
};

/// Manages the booking lifecycle: creation, the status state machine, and the
/// role-scoped listings the dashboards are built from.
pub struct BookingManager {
    context: HubContext,
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("user:{0} cannot be booked as a student")]
    NotAStudent(String),
    #[error("user:{0} is not a counsellor")]
    CounsellorRequired(String),
    #[error("Bookings must be scheduled in the future")]
    ScheduledInPast,
    #[error("Cannot change a {from} booking to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    #[error("Not allowed to {0}")]
    Forbidden(&'static str),
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// A booking as requested by a caller, before validation
#[derive(Debug)]
pub struct NewBookingRequest {
    /// The student the booking is for. Must be the caller, unless an admin is
    /// booking on a student's behalf.
    pub student_id: UserId,
    pub counsellor_id: UserId,
    pub scheduled_at: DateTime<Utc>,
    pub kind: BookingKind,
    pub notes: Option<String>,
}

/// The fields a caller may change on a booking
#[derive(Debug, Default)]
pub struct BookingPatch {
    pub status: Option<BookingStatus>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub student_notes: Option<String>,
}

impl BookingManager {
    pub fn new(context: &HubContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Requests a new booking with a counsellor. Always starts out pending.
    pub async fn create(
        &self,
        caller: &UserData,
        request: NewBookingRequest,
    ) -> Result<BookingData, BookingError> {
        if !can_perform(
            caller.role,
            Action::CreateBooking,
            Some(&request.student_id),
            Some(&caller.id),
        ) {
            return Err(BookingError::Forbidden("book for this student"));
        }

        let db = &self.context.database;

        let student = db.user_by_id(&request.student_id).await?;

        if student.role != Role::Student {
            return Err(BookingError::NotAStudent(student.id));
        }

        let counsellor = db
            .user_by_id(&request.counsellor_id)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => BookingError::CounsellorRequired(request.counsellor_id.clone()),
                e => e.into(),
            })?;

        if counsellor.role != Role::Counsellor {
            return Err(BookingError::CounsellorRequired(counsellor.id));
        }

        if request.scheduled_at <= Utc::now() {
            return Err(BookingError::ScheduledInPast);
        }

        let booking = db
            .create_booking(NewBooking {
                student_id: student.id,
                counsellor_id: counsellor.id,
                scheduled_at: request.scheduled_at,
                kind: request.kind,
                notes: request.notes,
            })
            .await?;

        self.notify_participants(&booking);

        Ok(booking)
    }

    /// Applies a patch to a booking, enforcing the status state machine and
    /// the role rules for every field touched.
    pub async fn update(
        &self,
        caller: &UserData,
        booking_id: PrimaryKey,
        patch: BookingPatch,
    ) -> Result<BookingData, BookingError> {
        let db = &self.context.database;
        let booking = db.booking_by_id(booking_id).await?;

        // The ownership side that matters depends on the seat the caller
        // occupies on this booking
        let owner_id = match caller.role {
            Role::Student => booking.student.id.clone(),
            _ => booking.counsellor.id.clone(),
        };

        if let Some(next) = patch.status {
            // Legality first: an impossible edge is a bad request no matter
            // who asks, including admins
            if !booking.status.can_transition_to(next) {
                return Err(BookingError::InvalidTransition {
                    from: booking.status,
                    to: next,
                });
            }

            let action = match next {
                BookingStatus::Confirmed => Action::ConfirmBooking,
                BookingStatus::Completed => Action::CompleteBooking,
                BookingStatus::Cancelled => Action::CancelBooking,
                BookingStatus::Pending => {
                    return Err(BookingError::InvalidTransition {
                        from: booking.status,
                        to: next,
                    })
                }
            };

            if !can_perform(caller.role, action, Some(&owner_id), Some(&caller.id)) {
                return Err(BookingError::Forbidden("change this booking's status"));
            }
        }

        if let Some(scheduled_at) = patch.scheduled_at {
            if !can_perform(
                caller.role,
                Action::RescheduleBooking,
                Some(&owner_id),
                Some(&caller.id),
            ) {
                return Err(BookingError::Forbidden("reschedule this booking"));
            }

            if booking.status.is_terminal() {
                return Err(BookingError::Forbidden("reschedule a closed booking"));
            }

            // Students may only move a booking around while it's still pending
            if caller.role == Role::Student && booking.status != BookingStatus::Pending {
                return Err(BookingError::Forbidden(
                    "reschedule a booking that is no longer pending",
                ));
            }

            if scheduled_at <= Utc::now() {
                return Err(BookingError::ScheduledInPast);
            }
        }

        if patch.notes.is_some()
            && !can_perform(
                caller.role,
                Action::EditCounsellorNotes,
                Some(&booking.counsellor.id),
                Some(&caller.id),
            )
        {
            return Err(BookingError::Forbidden("edit counsellor notes"));
        }

        if patch.student_notes.is_some()
            && !can_perform(
                caller.role,
                Action::EditStudentNotes,
                Some(&booking.student.id),
                Some(&caller.id),
            )
        {
            return Err(BookingError::Forbidden("edit student notes"));
        }

        let updated = db
            .update_booking(UpdatedBooking {
                id: booking.id,
                status: patch.status,
                scheduled_at: patch.scheduled_at,
                notes: patch.notes,
                student_notes: patch.student_notes,
            })
            .await?;

        Ok(updated)
    }

    /// The caller's own bookings, student seat
    pub async fn for_student(&self, caller: &UserData) -> Result<Vec<BookingData>, BookingError> {
        if caller.role != Role::Student {
            return Err(BookingError::Forbidden("list student bookings"));
        }

        Ok(self.context.database.bookings_by_student(&caller.id).await?)
    }

    /// The caller's own bookings, counsellor seat
    pub async fn for_counsellor(
        &self,
        caller: &UserData,
    ) -> Result<Vec<BookingData>, BookingError> {
        if caller.role != Role::Counsellor {
            return Err(BookingError::Forbidden("list counsellor bookings"));
        }

        Ok(self
            .context
            .database
            .bookings_by_counsellor(&caller.id)
            .await?)
    }

    /// The pending queue: a counsellor's own requests, or all of them for admins
    pub async fn pending(&self, caller: &UserData) -> Result<Vec<BookingData>, BookingError> {
        let db = &self.context.database;

        match caller.role {
            Role::Admin => Ok(db.bookings_by_status(BookingStatus::Pending).await?),
            Role::Counsellor => {
                let mut bookings = db.bookings_by_counsellor(&caller.id).await?;
                bookings.retain(|b| b.status == BookingStatus::Pending);

                Ok(bookings)
            }
            Role::Student => Err(BookingError::Forbidden("list pending bookings")),
        }
    }

    /// Every booking on the platform, admins only
    pub async fn all(&self, caller: &UserData) -> Result<Vec<BookingData>, BookingError> {
        if !can_perform(caller.role, Action::ViewAllBookings, None, None) {
            return Err(BookingError::Forbidden("list all bookings"));
        }

        Ok(self.context.database.list_bookings().await?)
    }

    fn notify_participants(&self, booking: &BookingData) {
        let notifier = self.context.notifier.clone();
        let booking = booking.clone();

        tokio::spawn(async move {
            let notification = Notification::BookingRequested {
                booking: booking.clone(),
            };

            for recipient in [&booking.student, &booking.counsellor] {
                if let Err(e) = notifier.notify(recipient, &notification).await {
                    warn!(
                        "Failed to notify {} about booking {}: {e}",
                        recipient.email, booking.id
                    );
                }
            }
        });
    }
}

#[cfg(test)]
mod test {
    use chrono::{Duration, Utc};

    use super::{BookingError, BookingPatch, NewBookingRequest};
    use crate::{testing, BookingKind, BookingStatus, Role, UserData};

    fn request_with(student: &UserData, counsellor_id: &str) -> NewBookingRequest {
        NewBookingRequest {
            student_id: student.id.clone(),
            counsellor_id: counsellor_id.to_string(),
            scheduled_at: Utc::now() + Duration::days(7),
            kind: BookingKind::Individual,
            notes: None,
        }
    }

    fn status_patch(status: BookingStatus) -> BookingPatch {
        BookingPatch {
            status: Some(status),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn booking_lifecycle() {
        let hub = testing::hub();
        let alice = testing::user(&hub, "alice@example.com", Role::Student).await;
        let drbob = testing::user(&hub, "drbob@example.com", Role::Counsellor).await;

        let booking = hub
            .bookings
            .create(&alice, request_with(&alice, &drbob.id))
            .await
            .expect("books");

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.student.id, alice.id);
        assert_eq!(booking.counsellor.id, drbob.id);

        let confirmed = hub
            .bookings
            .update(&drbob, booking.id, status_patch(BookingStatus::Confirmed))
            .await
            .expect("counsellor confirms");

        assert_eq!(confirmed.status, BookingStatus::Confirmed);

        // Only the counsellor or an admin may mark a booking completed
        let result = hub
            .bookings
            .update(&alice, booking.id, status_patch(BookingStatus::Completed))
            .await;

        assert!(matches!(result, Err(BookingError::Forbidden(_))));

        let completed = hub
            .bookings
            .update(&drbob, booking.id, status_patch(BookingStatus::Completed))
            .await
            .expect("counsellor completes");

        assert_eq!(completed.status, BookingStatus::Completed);
    }

    #[tokio::test]
    async fn students_only_see_their_own_bookings() {
        let hub = testing::hub();
        let alice = testing::user(&hub, "alice@example.com", Role::Student).await;
        let carol = testing::user(&hub, "carol@example.com", Role::Student).await;
        let drbob = testing::user(&hub, "drbob@example.com", Role::Counsellor).await;

        hub.bookings
            .create(&alice, request_with(&alice, &drbob.id))
            .await
            .expect("alice books");
        hub.bookings
            .create(&carol, request_with(&carol, &drbob.id))
            .await
            .expect("carol books");

        let bookings = hub.bookings.for_student(&alice).await.expect("lists");

        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].student.id, alice.id);

        let assigned = hub.bookings.for_counsellor(&drbob).await.expect("lists");
        assert_eq!(assigned.len(), 2);
    }

    #[tokio::test]
    async fn counsellor_must_resolve_to_a_counsellor() {
        let hub = testing::hub();
        let alice = testing::user(&hub, "alice@example.com", Role::Student).await;
        let carol = testing::user(&hub, "carol@example.com", Role::Student).await;

        let result = hub
            .bookings
            .create(&alice, request_with(&alice, &carol.id))
            .await;

        assert!(matches!(result, Err(BookingError::CounsellorRequired(_))));

        let result = hub
            .bookings
            .create(&alice, request_with(&alice, "no-such-user"))
            .await;

        assert!(matches!(result, Err(BookingError::CounsellorRequired(_))));
    }

    #[tokio::test]
    async fn students_cannot_book_for_someone_else() {
        let hub = testing::hub();
        let alice = testing::user(&hub, "alice@example.com", Role::Student).await;
        let carol = testing::user(&hub, "carol@example.com", Role::Student).await;
        let drbob = testing::user(&hub, "drbob@example.com", Role::Counsellor).await;

        let result = hub
            .bookings
            .create(&alice, request_with(&carol, &drbob.id))
            .await;

        assert!(matches!(result, Err(BookingError::Forbidden(_))));

        // An admin may book on a student's behalf
        let admin = testing::user(&hub, "root@example.com", Role::Admin).await;

        hub.bookings
            .create(&admin, request_with(&carol, &drbob.id))
            .await
            .expect("admin books for carol");
    }

    #[tokio::test]
    async fn bookings_cannot_be_scheduled_in_the_past() {
        let hub = testing::hub();
        let alice = testing::user(&hub, "alice@example.com", Role::Student).await;
        let drbob = testing::user(&hub, "drbob@example.com", Role::Counsellor).await;

        let mut request = request_with(&alice, &drbob.id);
        request.scheduled_at = Utc::now() - Duration::hours(1);

        let result = hub.bookings.create(&alice, request).await;

        assert!(matches!(result, Err(BookingError::ScheduledInPast)));
    }

    #[tokio::test]
    async fn illegal_transitions_are_rejected() {
        let hub = testing::hub();
        let alice = testing::user(&hub, "alice@example.com", Role::Student).await;
        let drbob = testing::user(&hub, "drbob@example.com", Role::Counsellor).await;
        let admin = testing::user(&hub, "root@example.com", Role::Admin).await;

        let booking = hub
            .bookings
            .create(&alice, request_with(&alice, &drbob.id))
            .await
            .expect("books");

        // pending -> completed skips confirmation
        let result = hub
            .bookings
            .update(&drbob, booking.id, status_patch(BookingStatus::Completed))
            .await;

        assert!(matches!(
            result,
            Err(BookingError::InvalidTransition { .. })
        ));

        hub.bookings
            .update(&drbob, booking.id, status_patch(BookingStatus::Confirmed))
            .await
            .expect("confirms");
        hub.bookings
            .update(&drbob, booking.id, status_patch(BookingStatus::Completed))
            .await
            .expect("completes");

        // Terminal states stay terminal, even for admins
        for next in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
        ] {
            let result = hub
                .bookings
                .update(&admin, booking.id, status_patch(next))
                .await;

            assert!(matches!(
                result,
                Err(BookingError::InvalidTransition { .. })
            ));
        }
    }

    #[tokio::test]
    async fn owning_student_may_cancel_while_pending() {
        let hub = testing::hub();
        let alice = testing::user(&hub, "alice@example.com", Role::Student).await;
        let carol = testing::user(&hub, "carol@example.com", Role::Student).await;
        let drbob = testing::user(&hub, "drbob@example.com", Role::Counsellor).await;

        let booking = hub
            .bookings
            .create(&alice, request_with(&alice, &drbob.id))
            .await
            .expect("books");

        // Another student has no say in it
        let result = hub
            .bookings
            .update(&carol, booking.id, status_patch(BookingStatus::Cancelled))
            .await;

        assert!(matches!(result, Err(BookingError::Forbidden(_))));

        let cancelled = hub
            .bookings
            .update(&alice, booking.id, status_patch(BookingStatus::Cancelled))
            .await
            .expect("owner cancels");

        assert_eq!(cancelled.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn notes_are_scoped_per_seat() {
        let hub = testing::hub();
        let alice = testing::user(&hub, "alice@example.com", Role::Student).await;
        let drbob = testing::user(&hub, "drbob@example.com", Role::Counsellor).await;

        let booking = hub
            .bookings
            .create(&alice, request_with(&alice, &drbob.id))
            .await
            .expect("books");

        let patch = BookingPatch {
            notes: Some("intake done".to_string()),
            ..Default::default()
        };

        let result = hub.bookings.update(&alice, booking.id, patch).await;
        assert!(matches!(result, Err(BookingError::Forbidden(_))));

        let patch = BookingPatch {
            student_notes: Some("looking forward to it".to_string()),
            ..Default::default()
        };

        let updated = hub
            .bookings
            .update(&alice, booking.id, patch)
            .await
            .expect("student writes their own notes");

        assert_eq!(updated.student_notes.as_deref(), Some("looking forward to it"));
    }

    #[tokio::test]
    async fn pending_queue_is_scoped() {
        let hub = testing::hub();
        let alice = testing::user(&hub, "alice@example.com", Role::Student).await;
        let drbob = testing::user(&hub, "drbob@example.com", Role::Counsellor).await;
        let dreve = testing::user(&hub, "dreve@example.com", Role::Counsellor).await;
        let admin = testing::user(&hub, "root@example.com", Role::Admin).await;

        let first = hub
            .bookings
            .create(&alice, request_with(&alice, &drbob.id))
            .await
            .expect("books");
        hub.bookings
            .create(&alice, request_with(&alice, &dreve.id))
            .await
            .expect("books");

        hub.bookings
            .update(&drbob, first.id, status_patch(BookingStatus::Confirmed))
            .await
            .expect("confirms");

        assert_eq!(hub.bookings.pending(&drbob).await.expect("lists").len(), 0);
        assert_eq!(hub.bookings.pending(&dreve).await.expect("lists").len(), 1);
        assert_eq!(hub.bookings.pending(&admin).await.expect("lists").len(), 1);

        let result = hub.bookings.pending(&alice).await;
        assert!(matches!(result, Err(BookingError::Forbidden(_))));

        let result = hub.bookings.all(&drbob).await;
        assert!(matches!(result, Err(BookingError::Forbidden(_))));

        assert_eq!(hub.bookings.all(&admin).await.expect("lists").len(), 2);
    }
}
