use thiserror::Error;

use crate::{DatabaseError, HubContext, NewProgress, PrimaryKey, ProgressData, UserData};

/// Tracks how far each user has gotten with the resources they work through.
pub struct ProgressManager {
    context: HubContext,
}

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("Progress must be between 0 and 100")]
    OutOfRange,
    #[error("resource:{0} is not available")]
    UnknownResource(PrimaryKey),
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

impl ProgressManager {
    pub fn new(context: &HubContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Records the caller's progress on a resource. One row per
    /// (user, resource) pair: repeat calls update in place.
    pub async fn upsert(
        &self,
        caller: &UserData,
        resource_id: PrimaryKey,
        progress: i32,
    ) -> Result<ProgressData, ProgressError> {
        if !(0..=100).contains(&progress) {
            return Err(ProgressError::OutOfRange);
        }

        let db = &self.context.database;

        let resource = db.resource_by_id(resource_id).await.map_err(|e| match e {
            DatabaseError::NotFound {
                resource: _,
                identifier: _,
            } => ProgressError::UnknownResource(resource_id),
            e => e.into(),
        })?;

        if !resource.is_active {
            return Err(ProgressError::UnknownResource(resource_id));
        }

        Ok(db
            .upsert_progress(NewProgress {
                user_id: caller.id.clone(),
                resource_id,
                progress,
            })
            .await?)
    }

    /// The caller's own progress rows
    pub async fn for_user(&self, caller: &UserData) -> Result<Vec<ProgressData>, ProgressError> {
        Ok(self.context.database.progress_for_user(&caller.id).await?)
    }
}

#[cfg(test)]
mod test {
    use super::ProgressError;
    use crate::{resources::NewResourceRequest, testing, ResourceKind, Role};

    async fn video(hub: &crate::Hub) -> crate::ResourceData {
        let drbob = testing::user(hub, "drbob@example.com", Role::Counsellor).await;

        hub.resources
            .create(
                &drbob,
                NewResourceRequest {
                    title: "Grounding techniques".to_string(),
                    description: "A short video".to_string(),
                    kind: ResourceKind::Video,
                    file_url: "https://cdn.example.com/videos/1.mp4".to_string(),
                    duration: Some(300),
                },
            )
            .await
            .expect("uploads")
    }

    #[tokio::test]
    async fn upsert_updates_in_place() {
        let hub = testing::hub();
        let resource = video(&hub).await;
        let alice = testing::user(&hub, "alice@example.com", Role::Student).await;

        let first = hub
            .progress
            .upsert(&alice, resource.id, 40)
            .await
            .expect("records");

        assert_eq!(first.progress, 40);
        assert!(first.completed_at.is_none());

        let second = hub
            .progress
            .upsert(&alice, resource.id, 70)
            .await
            .expect("updates");

        assert_eq!(second.id, first.id, "same row, not a duplicate");
        assert_eq!(second.progress, 70);

        let rows = hub.progress.for_user(&alice).await.expect("lists");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].progress, 70);
    }

    #[tokio::test]
    async fn completion_is_stamped_at_one_hundred() {
        let hub = testing::hub();
        let resource = video(&hub).await;
        let alice = testing::user(&hub, "alice@example.com", Role::Student).await;

        let done = hub
            .progress
            .upsert(&alice, resource.id, 100)
            .await
            .expect("completes");

        assert!(done.completed_at.is_some());

        // Dropping back below clears the stamp
        let partial = hub
            .progress
            .upsert(&alice, resource.id, 80)
            .await
            .expect("rewinds");

        assert!(partial.completed_at.is_none());
    }

    #[tokio::test]
    async fn range_and_resource_are_validated() {
        let hub = testing::hub();
        let resource = video(&hub).await;
        let alice = testing::user(&hub, "alice@example.com", Role::Student).await;

        let result = hub.progress.upsert(&alice, resource.id, 101).await;
        assert!(matches!(result, Err(ProgressError::OutOfRange)));

        let result = hub.progress.upsert(&alice, resource.id, -1).await;
        assert!(matches!(result, Err(ProgressError::OutOfRange)));

        let result = hub.progress.upsert(&alice, 9999, 50).await;
        assert!(matches!(result, Err(ProgressError::UnknownResource(_))));

        let drbob = hub
            .database()
            .user_by_email("drbob@example.com")
            .await
            .expect("exists");
        hub.resources
            .deactivate(&drbob, resource.id)
            .await
            .expect("deactivates");

        let result = hub.progress.upsert(&alice, resource.id, 50).await;
        assert!(matches!(result, Err(ProgressError::UnknownResource(_))));
    }

    #[tokio::test]
    async fn progress_listings_are_per_user() {
        let hub = testing::hub();
        let resource = video(&hub).await;
        let alice = testing::user(&hub, "alice@example.com", Role::Student).await;
        let carol = testing::user(&hub, "carol@example.com", Role::Student).await;

        hub.progress
            .upsert(&alice, resource.id, 30)
            .await
            .expect("records");

        assert_eq!(hub.progress.for_user(&alice).await.expect("lists").len(), 1);
        assert!(hub.progress.for_user(&carol).await.expect("lists").is_empty());
    }
}
