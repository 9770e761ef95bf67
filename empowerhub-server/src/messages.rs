use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json,
};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewMessageSchema, ValidatedJson},
    serialized::{Conversation, Message, ToSerialized},
    Router,
};

#[utoipa::path(
    post,
    path = "/api/messages",
    tag = "messages",
    request_body = NewMessageSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Message),
        (status = 400, description = "Receiver doesn't exist")
    )
)]
async fn send(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewMessageSchema>,
) -> ServerResult<Json<Message>> {
    let message = context
        .hub
        .messaging
        .send(&session.user(), &body.receiver_id, body.content)
        .await?;

    Ok(Json(message.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/api/messages/conversations",
    tag = "messages",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Conversation>)
    )
)]
async fn conversations(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Conversation>>> {
    let conversations = context.hub.messaging.conversations(&session.user()).await?;

    Ok(Json(conversations.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/api/messages/{id}",
    tag = "messages",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Message>, description = "The conversation with the given user, oldest first"),
        (status = 404, description = "No such user")
    )
)]
async fn conversation(
    session: Session,
    State(context): State<ServerContext>,
    Path(other_id): Path<String>,
) -> ServerResult<Json<Vec<Message>>> {
    let messages = context
        .hub
        .messaging
        .conversation(&session.user(), &other_id)
        .await?;

    Ok(Json(messages.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/api/messages/{id}/read",
    tag = "messages",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Message),
        (status = 403, description = "Only the receiver may mark a message read")
    )
)]
async fn mark_read(
    session: Session,
    State(context): State<ServerContext>,
    Path(message_id): Path<i32>,
) -> ServerResult<Json<Message>> {
    let message = context
        .hub
        .messaging
        .mark_read(&session.user(), message_id)
        .await?;

    Ok(Json(message.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(send))
        .route("/conversations", get(conversations))
        .route("/:id", get(conversation))
        .route("/:id/read", patch(mark_read))
}
