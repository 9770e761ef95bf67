use crate::Role;

/// An operation a caller wants to perform.
///
/// Where an action targets something owned by a user, the caller passes the
/// owning side that matters for them: the student on a booking when the caller
/// sits in the student seat, the assigned counsellor otherwise, the uploader
/// of a resource, the receiver of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Request a booking naming the owner as its student
    CreateBooking,
    /// Read a single booking
    ViewBooking,
    ConfirmBooking,
    CompleteBooking,
    CancelBooking,
    RescheduleBooking,
    /// Edit the counsellor's notes on a booking
    EditCounsellorNotes,
    /// Edit the student's notes on a booking
    EditStudentNotes,
    /// Upload a new resource
    CreateResource,
    /// Edit or deactivate an uploaded resource
    ManageResource,
    /// Track progress on a resource for the owning user
    UpdateProgress,
    /// Mark a received message as read
    MarkMessageRead,
    ViewAllBookings,
    ViewStats,
    ChangeRole,
}

/// Decides whether a role may perform an action, considering ownership where
/// the action has an owner. Every route goes through this one predicate.
pub fn can_perform(
    role: Role,
    action: Action,
    owner_id: Option<&str>,
    caller_id: Option<&str>,
) -> bool {
    // Admins may act on any user, booking, or resource
    if let Role::Admin = role {
        return true;
    }

    let owns = match (owner_id, caller_id) {
        (Some(owner), Some(caller)) => owner == caller,
        _ => false,
    };

    match action {
        Action::CreateBooking | Action::EditStudentNotes => role == Role::Student && owns,
        Action::ConfirmBooking
        | Action::CompleteBooking
        | Action::EditCounsellorNotes
        | Action::ManageResource => role == Role::Counsellor && owns,
        Action::ViewBooking
        | Action::CancelBooking
        | Action::RescheduleBooking
        | Action::UpdateProgress
        | Action::MarkMessageRead => owns,
        Action::CreateResource => role == Role::Counsellor,
        Action::ViewAllBookings | Action::ViewStats | Action::ChangeRole => false,
    }
}

#[cfg(test)]
mod test {
    use super::{can_perform, Action};
    use crate::Role;

    const ALICE: Option<&str> = Some("alice");
    const BOB: Option<&str> = Some("bob");

    #[test]
    fn admins_may_do_anything() {
        for action in [
            Action::CreateBooking,
            Action::CompleteBooking,
            Action::ManageResource,
            Action::ViewAllBookings,
            Action::ViewStats,
            Action::ChangeRole,
        ] {
            assert!(can_perform(Role::Admin, action, ALICE, BOB));
            assert!(can_perform(Role::Admin, action, None, None));
        }
    }

    #[test]
    fn students_are_scoped_to_themselves() {
        assert!(can_perform(Role::Student, Action::CreateBooking, ALICE, ALICE));
        assert!(!can_perform(Role::Student, Action::CreateBooking, ALICE, BOB));

        assert!(can_perform(Role::Student, Action::CancelBooking, ALICE, ALICE));
        assert!(can_perform(Role::Student, Action::EditStudentNotes, ALICE, ALICE));
        assert!(!can_perform(Role::Student, Action::EditCounsellorNotes, ALICE, ALICE));

        // Students never confirm or complete, not even "their own"
        assert!(!can_perform(Role::Student, Action::ConfirmBooking, ALICE, ALICE));
        assert!(!can_perform(Role::Student, Action::CompleteBooking, ALICE, ALICE));
    }

    #[test]
    fn counsellors_manage_what_is_theirs() {
        assert!(can_perform(Role::Counsellor, Action::ConfirmBooking, BOB, BOB));
        assert!(can_perform(Role::Counsellor, Action::CompleteBooking, BOB, BOB));
        assert!(can_perform(Role::Counsellor, Action::ManageResource, BOB, BOB));

        assert!(!can_perform(Role::Counsellor, Action::ConfirmBooking, ALICE, BOB));
        assert!(!can_perform(Role::Counsellor, Action::ManageResource, ALICE, BOB));

        assert!(can_perform(Role::Counsellor, Action::CreateResource, None, BOB));
        assert!(!can_perform(Role::Student, Action::CreateResource, None, ALICE));
    }

    #[test]
    fn ownership_alone_is_not_enough_for_admin_actions() {
        for role in [Role::Student, Role::Counsellor] {
            assert!(!can_perform(role, Action::ViewAllBookings, ALICE, ALICE));
            assert!(!can_perform(role, Action::ViewStats, ALICE, ALICE));
            assert!(!can_perform(role, Action::ChangeRole, ALICE, ALICE));
        }
    }

    #[test]
    fn missing_ownership_context_denies() {
        assert!(!can_perform(Role::Student, Action::CreateBooking, None, ALICE));
        assert!(!can_perform(Role::Student, Action::MarkMessageRead, ALICE, None));
        assert!(!can_perform(Role::Counsellor, Action::ConfirmBooking, None, None));
    }
}
