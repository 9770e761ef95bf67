//! Request bodies accepted by the endpoints, validated at the boundary

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use chrono::{DateTime, Utc};
use empowerhub_core::{BookingKind, BookingStatus, ResourceKind, Role};
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::ServerError;

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterSchema {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 64))]
    pub password: String,
    #[validate(length(min = 1, max = 128))]
    pub first_name: String,
    #[validate(length(min = 1, max = 128))]
    pub last_name: String,
    #[schema(value_type = String)]
    pub role: Role,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginSchema {
    #[validate(length(min = 1, max = 128))]
    pub email: String,
    #[validate(length(min = 1, max = 64))]
    pub password: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewSessionSchema {
    #[validate(length(min = 1, max = 64))]
    pub student_id: String,
    #[validate(length(min = 1, max = 64))]
    pub counsellor_id: String,
    pub scheduled_at: DateTime<Utc>,
    #[serde(rename = "type")]
    #[schema(value_type = String)]
    pub kind: BookingKind,
    #[validate(length(max = 2048))]
    pub notes: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateSessionSchema {
    #[schema(value_type = Option<String>)]
    pub status: Option<BookingStatus>,
    pub scheduled_at: Option<DateTime<Utc>>,
    #[validate(length(max = 2048))]
    pub notes: Option<String>,
    #[validate(length(max = 2048))]
    pub student_notes: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewResourceSchema {
    #[validate(length(min = 1, max = 256))]
    pub title: String,
    #[validate(length(max = 2048))]
    pub description: String,
    #[serde(rename = "type")]
    #[schema(value_type = String)]
    pub kind: ResourceKind,
    #[validate(length(min = 1, max = 1024))]
    pub file_url: String,
    #[validate(range(min = 0))]
    pub duration: Option<i32>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateResourceSchema {
    #[validate(length(min = 1, max = 256))]
    pub title: Option<String>,
    #[validate(length(max = 2048))]
    pub description: Option<String>,
    #[serde(rename = "type")]
    #[schema(value_type = Option<String>)]
    pub kind: Option<ResourceKind>,
    #[validate(length(min = 1, max = 1024))]
    pub file_url: Option<String>,
    #[validate(range(min = 0))]
    pub duration: Option<i32>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewMessageSchema {
    #[validate(length(min = 1, max = 64))]
    pub receiver_id: String,
    #[validate(length(min = 1, max = 4096))]
    pub content: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProgressSchema {
    pub resource_id: i32,
    #[validate(range(min = 0, max = 100))]
    pub progress: i32,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RoleSchema {
    #[schema(value_type = String)]
    pub role: Role,
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ServerError::validation(e.to_string()))?;

        value.validate().map_err(|e| ServerError::Validation {
            message: "Request body is invalid".to_string(),
            errors: serde_json::to_value(&e).ok(),
        })?;

        Ok(Self(value))
    }
}

#[cfg(test)]
mod test {
    use validator::Validate;

    use super::{ProgressSchema, RegisterSchema};

    fn registration(email: &str, password: &str) -> RegisterSchema {
        serde_json::from_value(serde_json::json!({
            "email": email,
            "password": password,
            "firstName": "Alice",
            "lastName": "Example",
            "role": "student",
        }))
        .expect("deserializes")
    }

    #[test]
    fn registration_bounds() {
        assert!(registration("alice@example.com", "pw12345678")
            .validate()
            .is_ok());
        assert!(registration("not-an-email", "pw12345678").validate().is_err());
        assert!(registration("alice@example.com", "short").validate().is_err());
    }

    #[test]
    fn unknown_roles_do_not_deserialize() {
        let result = serde_json::from_value::<RegisterSchema>(serde_json::json!({
            "email": "alice@example.com",
            "password": "pw12345678",
            "firstName": "Alice",
            "lastName": "Example",
            "role": "superuser",
        }));

        assert!(result.is_err());
    }

    #[test]
    fn progress_is_bounded() {
        let progress = |value: i32| ProgressSchema {
            resource_id: 1,
            progress: value,
        };

        assert!(progress(0).validate().is_ok());
        assert!(progress(100).validate().is_ok());
        assert!(progress(-1).validate().is_err());
        assert!(progress(101).validate().is_err());
    }
}
