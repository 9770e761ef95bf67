use axum::{extract::State, routing::get, Json};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    serialized::{Stats, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/api/analytics/stats",
    tag = "analytics",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Stats),
        (status = 403, description = "Admins only")
    )
)]
async fn stats(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Stats>> {
    let stats = context.hub.analytics.stats(&session.user()).await?;

    Ok(Json(stats.to_serialized()))
}

pub fn router() -> Router {
    Router::new().route("/stats", get(stats))
}
