use thiserror::Error;

use crate::{
    access::{can_perform, Action},
    DatabaseError, HubContext, Role, UserData,
};

/// User directory and admin-side account management.
pub struct UserManager {
    context: HubContext,
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Not allowed to {0}")]
    Forbidden(&'static str),
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

impl UserManager {
    pub fn new(context: &HubContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// The counsellor directory students pick from when booking
    pub async fn counsellors(&self) -> Result<Vec<UserData>, UserError> {
        Ok(self
            .context
            .database
            .list_users_by_role(Role::Counsellor)
            .await?)
    }

    /// Changes a user's role. Roles are immutable outside this explicit
    /// admin action.
    pub async fn set_role(
        &self,
        caller: &UserData,
        user_id: &str,
        role: Role,
    ) -> Result<UserData, UserError> {
        if !can_perform(caller.role, Action::ChangeRole, None, Some(&caller.id)) {
            return Err(UserError::Forbidden("change roles"));
        }

        Ok(self.context.database.set_user_role(user_id, role).await?)
    }
}
