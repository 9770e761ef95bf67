use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use empowerhub_core::{
    AnalyticsError, AuthError, BookingError, DatabaseError, MessagingError, ProgressError,
    ResourceError, UserError,
};
use log::error;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{message}")]
    Validation {
        message: String,
        /// Field-level details, when a schema produced them
        errors: Option<Value>,
    },
    #[error("{0}")]
    Authentication(&'static str),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Forbidden(String),
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("An admin account already exists")]
    AdminExists,
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

/// The JSON body every error renders as
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub errors: Option<Value>,
}

impl ServerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            errors: None,
        }
    }

    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Authentication(_) | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } | Self::AdminExists => StatusCode::CONFLICT,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.as_status_code();

        // Internals are logged server-side and never leak to the client
        let body = match self {
            Self::Unknown(details) => {
                error!("Internal error while handling request: {details}");

                ErrorBody {
                    message: "Internal server error".to_string(),
                    errors: None,
                }
            }
            Self::Validation { message, errors } => ErrorBody { message, errors },
            other => ErrorBody {
                message: other.to_string(),
                errors: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            DatabaseError::Conflict {
                resource,
                field,
                value,
            } => Self::Conflict {
                resource,
                field,
                value,
            },
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::AdminExists => Self::AdminExists,
            AuthError::InvalidEmail(email) => {
                Self::validation(format!("{email} is not a valid email address"))
            }
            AuthError::Db(e) => e.into(),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<BookingError> for ServerError {
    fn from(value: BookingError) -> Self {
        match value {
            BookingError::Forbidden(_) => Self::Forbidden(value.to_string()),
            BookingError::Db(e) => e.into(),
            e => Self::validation(e.to_string()),
        }
    }
}

impl From<MessagingError> for ServerError {
    fn from(value: MessagingError) -> Self {
        match value {
            MessagingError::Forbidden(_) => Self::Forbidden(value.to_string()),
            MessagingError::Db(e) => e.into(),
            e => Self::validation(e.to_string()),
        }
    }
}

impl From<ResourceError> for ServerError {
    fn from(value: ResourceError) -> Self {
        match value {
            ResourceError::Forbidden(_) => Self::Forbidden(value.to_string()),
            ResourceError::Db(e) => e.into(),
        }
    }
}

impl From<ProgressError> for ServerError {
    fn from(value: ProgressError) -> Self {
        match value {
            ProgressError::Db(e) => e.into(),
            e => Self::validation(e.to_string()),
        }
    }
}

impl From<UserError> for ServerError {
    fn from(value: UserError) -> Self {
        match value {
            UserError::Forbidden(_) => Self::Forbidden(value.to_string()),
            UserError::Db(e) => e.into(),
        }
    }
}

impl From<AnalyticsError> for ServerError {
    fn from(value: AnalyticsError) -> Self {
        match value {
            AnalyticsError::Forbidden(_) => Self::Forbidden(value.to_string()),
            AnalyticsError::Db(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use axum::http::StatusCode;
    use empowerhub_core::{AuthError, BookingError, BookingStatus, DatabaseError};

    use super::ServerError;

    fn status_of(error: ServerError) -> StatusCode {
        error.as_status_code()
    }

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            status_of(ServerError::validation("bad input")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ServerError::Authentication("Missing authorization")),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ServerError::Forbidden("Not allowed".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(ServerError::Unknown("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn core_errors_map_to_the_right_statuses() {
        let wrong_password: ServerError = AuthError::InvalidCredentials.into();
        assert_eq!(status_of(wrong_password), StatusCode::UNAUTHORIZED);

        let duplicate: ServerError = DatabaseError::Conflict {
            resource: "user",
            field: "email",
            value: "alice@example.com".to_string(),
        }
        .into();
        assert_eq!(status_of(duplicate), StatusCode::CONFLICT);

        let missing: ServerError = DatabaseError::NotFound {
            resource: "booking",
            identifier: "id",
        }
        .into();
        assert_eq!(status_of(missing), StatusCode::NOT_FOUND);

        let bad_edge: ServerError = BookingError::InvalidTransition {
            from: BookingStatus::Completed,
            to: BookingStatus::Pending,
        }
        .into();
        assert_eq!(status_of(bad_edge), StatusCode::BAD_REQUEST);

        let not_yours: ServerError =
            BookingError::Forbidden("change this booking's status").into();
        assert_eq!(status_of(not_yours), StatusCode::FORBIDDEN);
    }
}
