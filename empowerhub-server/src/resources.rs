use axum::{
    extract::{Path, State},
    routing::get,
    Json,
};
use empowerhub_core::{NewResourceRequest, ResourcePatch};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewResourceSchema, UpdateResourceSchema, ValidatedJson},
    serialized::{Resource, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/api/resources",
    tag = "resources",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Resource>)
    )
)]
async fn list(
    _session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Resource>>> {
    let resources = context.hub.resources.list().await?;

    Ok(Json(resources.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/api/resources/{id}",
    tag = "resources",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Resource),
        (status = 404, description = "No such resource, or it was removed")
    )
)]
async fn get_resource(
    session: Session,
    State(context): State<ServerContext>,
    Path(resource_id): Path<i32>,
) -> ServerResult<Json<Resource>> {
    let resource = context
        .hub
        .resources
        .get(&session.user(), resource_id)
        .await?;

    Ok(Json(resource.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/api/resources",
    tag = "resources",
    request_body = NewResourceSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Resource),
        (status = 403, description = "Students cannot upload resources")
    )
)]
async fn create(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewResourceSchema>,
) -> ServerResult<Json<Resource>> {
    let resource = context
        .hub
        .resources
        .create(
            &session.user(),
            NewResourceRequest {
                title: body.title,
                description: body.description,
                kind: body.kind,
                file_url: body.file_url,
                duration: body.duration,
            },
        )
        .await?;

    Ok(Json(resource.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/api/resources/{id}",
    tag = "resources",
    request_body = UpdateResourceSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Resource),
        (status = 403, description = "Only the uploader or an admin may edit")
    )
)]
async fn update(
    session: Session,
    State(context): State<ServerContext>,
    Path(resource_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<UpdateResourceSchema>,
) -> ServerResult<Json<Resource>> {
    let resource = context
        .hub
        .resources
        .update(
            &session.user(),
            resource_id,
            ResourcePatch {
                title: body.title,
                description: body.description,
                kind: body.kind,
                file_url: body.file_url,
                duration: body.duration,
            },
        )
        .await?;

    Ok(Json(resource.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/api/resources/{id}",
    tag = "resources",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Resource, description = "Resource was deactivated"),
        (status = 403, description = "Only the uploader or an admin may remove")
    )
)]
async fn remove(
    session: Session,
    State(context): State<ServerContext>,
    Path(resource_id): Path<i32>,
) -> ServerResult<Json<Resource>> {
    let resource = context
        .hub
        .resources
        .deactivate(&session.user(), resource_id)
        .await?;

    Ok(Json(resource.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(get_resource).patch(update).delete(remove))
}
