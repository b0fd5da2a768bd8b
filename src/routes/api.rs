//! REST endpoints backing the match, history, ranking and account pages.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{AdminUser, AuthUser},
    dao::models::{FavoriteTeamEntity, MatchEntity},
    dto::{
        account::{FavoriteTeamRequest, LeaderboardResponse, SubscriptionStatusResponse},
        history::HistoryResponse,
        matches::{AnalysisResponse, CreateMatchRequest, MatchListQuery, UpdateResultRequest},
    },
    error::{AppError, ErrorBody},
    services::{
        favorites_service, history_service, leaderboard_service, match_service,
        subscription_service,
    },
    state::SharedState,
};

pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/api/matches", get(list_matches).post(create_match))
        .route("/api/matches/{id}/analyze", post(analyze_match))
        .route("/api/matches/{id}/live", post(refresh_live))
        .route("/api/matches/{id}/result", put(update_result))
        .route("/api/history", get(history))
        .route("/api/leaderboard", get(leaderboard))
        .route("/api/subscription", get(subscription))
        .route("/api/favorites", get(list_favorites).post(add_favorite))
        .route("/api/favorites/{id}", delete(remove_favorite))
}

/// Matches newest first; the free tier only sees the next few upcoming fixtures.
#[utoipa::path(
    get,
    path = "/api/matches",
    tag = "matches",
    params(MatchListQuery),
    responses(
        (status = 200, description = "Visible matches", body = [MatchEntity]),
        (status = 401, description = "Not signed in", body = ErrorBody)
    )
)]
pub async fn list_matches(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Query(query): Query<MatchListQuery>,
) -> Result<Json<Vec<MatchEntity>>, AppError> {
    Ok(Json(match_service::list(&state, &user, &query).await?))
}

#[utoipa::path(
    post,
    path = "/api/matches",
    tag = "matches",
    request_body = CreateMatchRequest,
    responses(
        (status = 201, description = "Match created", body = MatchEntity),
        (status = 400, description = "Invalid match", body = ErrorBody),
        (status = 403, description = "Admin role required", body = ErrorBody)
    )
)]
pub async fn create_match(
    State(state): State<SharedState>,
    AdminUser(_admin): AdminUser,
    Json(payload): Json<CreateMatchRequest>,
) -> Result<(StatusCode, Json<MatchEntity>), AppError> {
    payload.validate()?;
    let created = match_service::create(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Generate an AI prediction and add it to the caller's history.
#[utoipa::path(
    post,
    path = "/api/matches/{id}/analyze",
    tag = "matches",
    params(("id" = String, Path, description = "Identifier of the match")),
    responses(
        (status = 200, description = "Analysed match and history entry", body = AnalysisResponse),
        (status = 404, description = "Unknown match", body = ErrorBody)
    )
)]
pub async fn analyze_match(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalysisResponse>, AppError> {
    Ok(Json(match_service::analyze(&state, &user, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/matches/{id}/live",
    tag = "matches",
    params(("id" = String, Path, description = "Identifier of the match")),
    responses(
        (status = 200, description = "Match with refreshed live data", body = MatchEntity),
        (status = 409, description = "Match already finished", body = ErrorBody)
    )
)]
pub async fn refresh_live(
    State(state): State<SharedState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchEntity>, AppError> {
    Ok(Json(match_service::refresh_live(&state, id).await?))
}

/// Record a final score and settle the predictions made on the match.
#[utoipa::path(
    put,
    path = "/api/matches/{id}/result",
    tag = "matches",
    params(("id" = String, Path, description = "Identifier of the match")),
    request_body = UpdateResultRequest,
    responses(
        (status = 200, description = "Finished match", body = MatchEntity),
        (status = 400, description = "Invalid score", body = ErrorBody),
        (status = 403, description = "Admin role required", body = ErrorBody)
    )
)]
pub async fn update_result(
    State(state): State<SharedState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateResultRequest>,
) -> Result<Json<MatchEntity>, AppError> {
    payload.validate()?;
    Ok(Json(match_service::update_result(&state, id, payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/history",
    tag = "history",
    responses((status = 200, description = "Caller's predictions and summary", body = HistoryResponse))
)]
pub async fn history(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
) -> Result<Json<HistoryResponse>, AppError> {
    Ok(Json(history_service::history(&state, &user).await?))
}

#[utoipa::path(
    get,
    path = "/api/leaderboard",
    tag = "history",
    responses((status = 200, description = "Top players by points", body = LeaderboardResponse))
)]
pub async fn leaderboard(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
) -> Result<Json<LeaderboardResponse>, AppError> {
    Ok(Json(
        leaderboard_service::leaderboard(&state, &user.email).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/subscription",
    tag = "billing",
    responses((status = 200, description = "Caller's active subscription", body = SubscriptionStatusResponse))
)]
pub async fn subscription(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
) -> Result<Json<SubscriptionStatusResponse>, AppError> {
    Ok(Json(subscription_service::current(&state, &user.email).await?))
}

#[utoipa::path(
    get,
    path = "/api/favorites",
    tag = "favorites",
    responses((status = 200, description = "Followed teams", body = [FavoriteTeamEntity]))
)]
pub async fn list_favorites(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<FavoriteTeamEntity>>, AppError> {
    Ok(Json(favorites_service::list(&state, &user.email).await?))
}

#[utoipa::path(
    post,
    path = "/api/favorites",
    tag = "favorites",
    request_body = FavoriteTeamRequest,
    responses(
        (status = 201, description = "Team followed", body = FavoriteTeamEntity),
        (status = 409, description = "Team already followed", body = ErrorBody)
    )
)]
pub async fn add_favorite(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<FavoriteTeamRequest>,
) -> Result<(StatusCode, Json<FavoriteTeamEntity>), AppError> {
    payload.validate()?;
    let favorite = favorites_service::add(&state, &user.email, payload).await?;
    Ok((StatusCode::CREATED, Json(favorite)))
}

#[utoipa::path(
    delete,
    path = "/api/favorites/{id}",
    tag = "favorites",
    params(("id" = String, Path, description = "Identifier of the favourite")),
    responses(
        (status = 204, description = "Team unfollowed"),
        (status = 404, description = "Unknown favourite", body = ErrorBody)
    )
)]
pub async fn remove_favorite(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    favorites_service::remove(&state, &user.email, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
