use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::{get, post},
};
use futures::Stream;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    dao::models::NotificationEntity,
    error::{AppError, ErrorBody},
    services::{notification_service, notification_stream},
    state::SharedState,
};

pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/stream", get(stream_notifications))
        .route("/api/notifications/{id}/read", post(mark_read))
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "notifications",
    responses((status = 200, description = "Caller's notifications, newest first", body = [NotificationEntity]))
)]
pub async fn list_notifications(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<NotificationEntity>>, AppError> {
    Ok(Json(
        notification_service::list_for_user(&state, &user.email).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    tag = "notifications",
    params(("id" = String, Path, description = "Identifier of the notification")),
    responses(
        (status = 200, description = "Notification marked as read", body = NotificationEntity),
        (status = 404, description = "Unknown notification", body = ErrorBody)
    )
)]
pub async fn mark_read(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<NotificationEntity>, AppError> {
    Ok(Json(
        notification_service::mark_read(&state, &user.email, id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/notifications/stream",
    tag = "notifications",
    responses((status = 200, description = "SSE stream of new notifications", content_type = "text/event-stream", body = String))
)]
/// Stream the caller's new notifications as `notification` events.
pub async fn stream_notifications(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(user = %user.email, "new notification stream");
    notification_stream::subscribe(&state, user.email)
}
