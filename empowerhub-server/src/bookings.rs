use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json,
};
use empowerhub_core::{BookingPatch, NewBookingRequest};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewSessionSchema, UpdateSessionSchema, ValidatedJson},
    serialized::{Booking, ToSerialized},
    Router,
};

#[utoipa::path(
    post,
    path = "/api/sessions",
    tag = "sessions",
    request_body = NewSessionSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Booking),
        (status = 400, description = "Counsellor doesn't resolve or the time is in the past"),
        (status = 403, description = "Caller may not book for the named student")
    )
)]
async fn create(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewSessionSchema>,
) -> ServerResult<Json<Booking>> {
    let booking = context
        .hub
        .bookings
        .create(
            &session.user(),
            NewBookingRequest {
                student_id: body.student_id,
                counsellor_id: body.counsellor_id,
                scheduled_at: body.scheduled_at,
                kind: body.kind,
                notes: body.notes,
            },
        )
        .await?;

    Ok(Json(booking.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/api/sessions/{id}",
    tag = "sessions",
    request_body = UpdateSessionSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Booking),
        (status = 400, description = "Illegal status transition"),
        (status = 403, description = "Caller's role may not perform this change"),
        (status = 404, description = "No such session")
    )
)]
async fn update(
    session: Session,
    State(context): State<ServerContext>,
    Path(booking_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<UpdateSessionSchema>,
) -> ServerResult<Json<Booking>> {
    let booking = context
        .hub
        .bookings
        .update(
            &session.user(),
            booking_id,
            BookingPatch {
                status: body.status,
                scheduled_at: body.scheduled_at,
                notes: body.notes,
                student_notes: body.student_notes,
            },
        )
        .await?;

    Ok(Json(booking.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/api/sessions/student",
    tag = "sessions",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Booking>)
    )
)]
async fn for_student(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Booking>>> {
    let bookings = context.hub.bookings.for_student(&session.user()).await?;

    Ok(Json(bookings.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/api/sessions/counsellor",
    tag = "sessions",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Booking>)
    )
)]
async fn for_counsellor(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Booking>>> {
    let bookings = context.hub.bookings.for_counsellor(&session.user()).await?;

    Ok(Json(bookings.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/api/sessions/pending",
    tag = "sessions",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Booking>)
    )
)]
async fn pending(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Booking>>> {
    let bookings = context.hub.bookings.pending(&session.user()).await?;

    Ok(Json(bookings.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/api/sessions/all",
    tag = "sessions",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Booking>),
        (status = 403, description = "Admins only")
    )
)]
async fn all(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Booking>>> {
    let bookings = context.hub.bookings.all(&session.user()).await?;

    Ok(Json(bookings.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create))
        .route("/student", get(for_student))
        .route("/counsellor", get(for_counsellor))
        .route("/pending", get(pending))
        .route("/all", get(all))
        .route("/:id", patch(update))
}
