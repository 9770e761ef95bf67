use thiserror::Error;

use crate::{
    access::{can_perform, Action},
    DatabaseError, HubContext, NewResource, PrimaryKey, ResourceData, ResourceKind, UpdatedResource,
    UserData,
};

/// The shared library of worksheets, videos, and other assets counsellors
/// publish for students.
pub struct ResourceManager {
    context: HubContext,
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Not allowed to {0}")]
    Forbidden(&'static str),
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// A resource as submitted by a caller
#[derive(Debug)]
pub struct NewResourceRequest {
    pub title: String,
    pub description: String,
    pub kind: ResourceKind,
    pub file_url: String,
    pub duration: Option<i32>,
}

/// The fields a caller may change on a resource
#[derive(Debug, Default)]
pub struct ResourcePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<ResourceKind>,
    pub file_url: Option<String>,
    pub duration: Option<i32>,
}

impl ResourceManager {
    pub fn new(context: &HubContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    pub async fn create(
        &self,
        caller: &UserData,
        request: NewResourceRequest,
    ) -> Result<ResourceData, ResourceError> {
        if !can_perform(caller.role, Action::CreateResource, None, Some(&caller.id)) {
            return Err(ResourceError::Forbidden("upload resources"));
        }

        Ok(self
            .context
            .database
            .create_resource(NewResource {
                title: request.title,
                description: request.description,
                kind: request.kind,
                file_url: request.file_url,
                duration: request.duration,
                uploaded_by: caller.id.clone(),
            })
            .await?)
    }

    /// Active resources, visible to anyone logged in
    pub async fn list(&self) -> Result<Vec<ResourceData>, ResourceError> {
        Ok(self.context.database.list_resources().await?)
    }

    /// A single resource. Deactivated ones only show for their uploader and
    /// admins; everyone else sees them as missing.
    pub async fn get(
        &self,
        caller: &UserData,
        resource_id: PrimaryKey,
    ) -> Result<ResourceData, ResourceError> {
        let resource = self.context.database.resource_by_id(resource_id).await?;

        if !resource.is_active && !self.may_manage(caller, &resource) {
            return Err(ResourceError::Db(DatabaseError::NotFound {
                resource: "resource",
                identifier: "id",
            }));
        }

        Ok(resource)
    }

    pub async fn update(
        &self,
        caller: &UserData,
        resource_id: PrimaryKey,
        patch: ResourcePatch,
    ) -> Result<ResourceData, ResourceError> {
        let resource = self.context.database.resource_by_id(resource_id).await?;

        if !self.may_manage(caller, &resource) {
            return Err(ResourceError::Forbidden("edit this resource"));
        }

        Ok(self
            .context
            .database
            .update_resource(UpdatedResource {
                id: resource.id,
                title: patch.title,
                description: patch.description,
                kind: patch.kind,
                file_url: patch.file_url,
                duration: patch.duration,
            })
            .await?)
    }

    /// Soft-deletes a resource by deactivating it
    pub async fn deactivate(
        &self,
        caller: &UserData,
        resource_id: PrimaryKey,
    ) -> Result<ResourceData, ResourceError> {
        let resource = self.context.database.resource_by_id(resource_id).await?;

        if !self.may_manage(caller, &resource) {
            return Err(ResourceError::Forbidden("remove this resource"));
        }

        Ok(self
            .context
            .database
            .deactivate_resource(resource_id)
            .await?)
    }

    fn may_manage(&self, caller: &UserData, resource: &ResourceData) -> bool {
        can_perform(
            caller.role,
            Action::ManageResource,
            Some(&resource.uploaded_by.id),
            Some(&caller.id),
        )
    }
}

#[cfg(test)]
mod test {
    use super::{NewResourceRequest, ResourceError, ResourcePatch};
    use crate::{testing, DatabaseError, ResourceKind, Role};

    fn worksheet(title: &str) -> NewResourceRequest {
        NewResourceRequest {
            title: title.to_string(),
            description: "A short worksheet".to_string(),
            kind: ResourceKind::Worksheet,
            file_url: "https://cdn.example.com/worksheets/1.pdf".to_string(),
            duration: None,
        }
    }

    #[tokio::test]
    async fn students_cannot_upload() {
        let hub = testing::hub();
        let alice = testing::user(&hub, "alice@example.com", Role::Student).await;

        let result = hub.resources.create(&alice, worksheet("Breathing")).await;

        assert!(matches!(result, Err(ResourceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn uploader_owns_their_resources() {
        let hub = testing::hub();
        let drbob = testing::user(&hub, "drbob@example.com", Role::Counsellor).await;
        let dreve = testing::user(&hub, "dreve@example.com", Role::Counsellor).await;

        let resource = hub
            .resources
            .create(&drbob, worksheet("Breathing"))
            .await
            .expect("uploads");

        let patch = ResourcePatch {
            title: Some("Breathing exercises".to_string()),
            ..Default::default()
        };

        // Another counsellor can't touch it, role alone is not enough
        let result = hub.resources.update(&dreve, resource.id, patch).await;
        assert!(matches!(result, Err(ResourceError::Forbidden(_))));

        let patch = ResourcePatch {
            title: Some("Breathing exercises".to_string()),
            ..Default::default()
        };

        let updated = hub
            .resources
            .update(&drbob, resource.id, patch)
            .await
            .expect("uploader edits");

        assert_eq!(updated.title, "Breathing exercises");
    }

    #[tokio::test]
    async fn deactivation_hides_from_listing() {
        let hub = testing::hub();
        let alice = testing::user(&hub, "alice@example.com", Role::Student).await;
        let drbob = testing::user(&hub, "drbob@example.com", Role::Counsellor).await;

        let resource = hub
            .resources
            .create(&drbob, worksheet("Breathing"))
            .await
            .expect("uploads");

        assert_eq!(hub.resources.list().await.expect("lists").len(), 1);

        let removed = hub
            .resources
            .deactivate(&drbob, resource.id)
            .await
            .expect("deactivates");

        assert!(!removed.is_active);
        assert!(hub.resources.list().await.expect("lists").is_empty());

        // A student now sees it as missing, the uploader still sees it
        let result = hub.resources.get(&alice, resource.id).await;
        assert!(matches!(
            result,
            Err(ResourceError::Db(DatabaseError::NotFound { .. }))
        ));

        hub.resources
            .get(&drbob, resource.id)
            .await
            .expect("uploader still sees it");
    }
}
