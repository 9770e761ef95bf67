use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{header, request::Parts},
    routing::{get, post},
    Json,
};
use empowerhub_core::{AuthSessionData, Credentials, NewRegistration, UserData};

use crate::{
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{LoginSchema, RegisterSchema, ValidatedJson},
    serialized::{LoginResult, MessageResult, RegisterResult, ToSerialized, User},
    Router,
};

/// Wraps [AuthSessionData] so [FromRequestParts] can be implemented for it
pub struct Session(AuthSessionData);

impl Session {
    /// Returns the user of the session
    pub fn user(&self) -> UserData {
        self.0.user.clone()
    }

    pub fn token(&self) -> &str {
        &self.0.token
    }
}

#[async_trait]
impl FromRequestParts<ServerContext> for Session {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        let context = ServerContext::from_ref(state);

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|x| x.to_str().ok())
            .ok_or(ServerError::Authentication("Missing authorization"))?;

        let parts: Vec<_> = header_value.split_ascii_whitespace().collect();

        if parts.first() != Some(&"Bearer") {
            return Err(ServerError::Authentication("Authorization must be Bearer"));
        }

        let token = parts.last().cloned().unwrap_or_default();

        let session = context
            .hub
            .auth
            .session(token)
            .await
            .map_err(|_| ServerError::Authentication("Session does not exist"))?;

        Ok(Self(session))
    }
}

#[utoipa::path(
    post,
    path = "/api/register",
    tag = "auth",
    request_body = RegisterSchema,
    responses(
        (status = 200, body = RegisterResult),
        (status = 400, description = "Malformed registration"),
        (status = 409, description = "Email is already taken")
    )
)]
async fn register(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<RegisterSchema>,
) -> ServerResult<Json<RegisterResult>> {
    let user = context
        .hub
        .auth
        .register(NewRegistration {
            email: body.email,
            password: body.password,
            first_name: body.first_name,
            last_name: body.last_name,
            role: body.role,
        })
        .await?;

    Ok(Json(user.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/api/login",
    tag = "auth",
    request_body = LoginSchema,
    responses(
        (status = 200, body = LoginResult),
        (status = 401, description = "Unknown email or wrong password")
    )
)]
async fn login(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<LoginSchema>,
) -> ServerResult<Json<LoginResult>> {
    let session = context
        .hub
        .auth
        .login(Credentials {
            email: body.email,
            password: body.password,
        })
        .await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/api/logout",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = MessageResult)
    )
)]
async fn logout(
    State(context): State<ServerContext>,
    session: Session,
) -> ServerResult<Json<MessageResult>> {
    context.hub.auth.logout(session.token()).await?;

    Ok(Json(MessageResult::new("Logged out")))
}

#[utoipa::path(
    get,
    path = "/api/auth/user",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User)
    )
)]
async fn user(session: Session) -> Json<User> {
    Json(session.user().to_serialized())
}

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/auth/user", get(user))
}
