use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Json,
};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{RoleSchema, ValidatedJson},
    serialized::{ToSerialized, User},
    Router,
};

#[utoipa::path(
    get,
    path = "/api/counsellors",
    tag = "users",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<User>, description = "The counsellor directory")
    )
)]
async fn counsellors(
    _session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<User>>> {
    let counsellors = context.hub.users.counsellors().await?;

    Ok(Json(counsellors.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/api/users/{id}/role",
    tag = "users",
    request_body = RoleSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User),
        (status = 403, description = "Admins only"),
        (status = 404, description = "No such user")
    )
)]
async fn set_role(
    session: Session,
    State(context): State<ServerContext>,
    Path(user_id): Path<String>,
    ValidatedJson(body): ValidatedJson<RoleSchema>,
) -> ServerResult<Json<User>> {
    let user = context
        .hub
        .users
        .set_role(&session.user(), &user_id, body.role)
        .await?;

    Ok(Json(user.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/counsellors", get(counsellors))
        .route("/users/:id/role", patch(set_role))
}
