use thiserror::Error;

use crate::{
    access::{can_perform, Action},
    DatabaseError, HubContext, StatsData, UserData,
};

/// Platform counters for the admin dashboard.
pub struct Analytics {
    context: HubContext,
}

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Not allowed to {0}")]
    Forbidden(&'static str),
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

impl Analytics {
    pub fn new(context: &HubContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    pub async fn stats(&self, caller: &UserData) -> Result<StatsData, AnalyticsError> {
        if !can_perform(caller.role, Action::ViewStats, None, Some(&caller.id)) {
            return Err(AnalyticsError::Forbidden("view platform stats"));
        }

        Ok(self.context.database.stats().await?)
    }
}

#[cfg(test)]
mod test {
    use super::AnalyticsError;
    use crate::{testing, Role};

    #[tokio::test]
    async fn stats_are_admin_only() {
        let hub = testing::hub();
        let alice = testing::user(&hub, "alice@example.com", Role::Student).await;
        let admin = testing::user(&hub, "root@example.com", Role::Admin).await;

        let result = hub.analytics.stats(&alice).await;
        assert!(matches!(result, Err(AnalyticsError::Forbidden(_))));

        let stats = hub.analytics.stats(&admin).await.expect("admin reads");

        assert_eq!(stats.students, 1);
        assert_eq!(stats.bookings, 0);
    }
}
