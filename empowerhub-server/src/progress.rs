use axum::{
    extract::State,
    routing::{get, post},
    Json,
};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{ProgressSchema, ValidatedJson},
    serialized::{Progress, ToSerialized},
    Router,
};

#[utoipa::path(
    post,
    path = "/api/progress",
    tag = "progress",
    request_body = ProgressSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Progress),
        (status = 400, description = "Progress out of range or resource unavailable")
    )
)]
async fn upsert(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<ProgressSchema>,
) -> ServerResult<Json<Progress>> {
    let progress = context
        .hub
        .progress
        .upsert(&session.user(), body.resource_id, body.progress)
        .await?;

    Ok(Json(progress.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/api/progress",
    tag = "progress",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Progress>)
    )
)]
async fn list(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Progress>>> {
    let rows = context.hub.progress.for_user(&session.user()).await?;

    Ok(Json(rows.to_serialized()))
}

pub fn router() -> Router {
    Router::new().route("/", get(list).post(upsert))
}
