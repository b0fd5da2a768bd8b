//! `/functions/<name>` endpoints called by the web client.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header::ORIGIN},
    routing::post,
};
use tracing::info;

use crate::{
    auth::{AdminUser, AuthUser},
    dto::functions::{
        CheckoutRequest, CheckoutResponse, EnrichMatchRequest, EnrichMatchResponse,
        HeadToHeadRequest, HeadToHeadResponse, LoadMatchesResponse, NotifyFavoritesResponse,
        ReconcileReport, SyncAllResponse, SyncLeagueRequest, SyncLeagueResponse,
        TrackVisitResponse, UpdateStatsRequest, UpdateStatsResponse, WebhookAck,
    },
    error::{AppError, ErrorBody},
    services::{
        checkout_service, football_service, match_service, notification_service, reconciler,
        stats_service, subscription_service,
    },
    state::SharedState,
};

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/functions/createCheckout", post(create_checkout))
        .route("/functions/stripeWebhook", post(stripe_webhook))
        .route("/functions/enrichMatchData", post(enrich_match_data))
        .route("/functions/getTeamH2H", post(get_team_h2h))
        .route("/functions/loadRealMatches", post(load_real_matches))
        .route("/functions/syncFootballData", post(sync_football_data))
        .route("/functions/syncAllLeagues", post(sync_all_leagues))
        .route("/functions/notifyFavoriteTeams", post(notify_favorite_teams))
        .route("/functions/trackVisit", post(track_visit))
        .route("/functions/updateUserStats", post(update_user_stats))
        .route("/functions/autoUpdateResults", post(auto_update_results))
}

/// Start a Stripe Checkout session for a premium plan.
#[utoipa::path(
    post,
    path = "/functions/createCheckout",
    tag = "billing",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Checkout session created", body = CheckoutResponse),
        (status = 400, description = "Unknown plan or missing origin", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody)
    )
)]
pub async fn create_checkout(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    headers: HeaderMap,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let origin = headers.get(ORIGIN).and_then(|value| value.to_str().ok());
    let response =
        checkout_service::create_checkout(&state, &user, payload.plan.as_deref(), origin).await?;
    Ok(Json(response))
}

/// Receive a signed Stripe event.
#[utoipa::path(
    post,
    path = "/functions/stripeWebhook",
    tag = "billing",
    request_body(content = String, description = "Raw Stripe event payload", content_type = "application/json"),
    params(("stripe-signature" = String, Header, description = "t=<unix>,v1=<hex> signature")),
    responses(
        (status = 200, description = "Event acknowledged", body = WebhookAck),
        (status = 400, description = "Missing or invalid signature", body = ErrorBody)
    )
)]
pub async fn stripe_webhook(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    Ok(Json(
        subscription_service::handle_webhook(&state, signature, &body).await?,
    ))
}

/// Prepend league-table statistics to a match analysis.
#[utoipa::path(
    post,
    path = "/functions/enrichMatchData",
    tag = "football",
    request_body = EnrichMatchRequest,
    responses(
        (status = 200, description = "Enrichment outcome", body = EnrichMatchResponse),
        (status = 400, description = "Missing match id", body = ErrorBody),
        (status = 404, description = "Unknown match", body = ErrorBody)
    )
)]
pub async fn enrich_match_data(
    State(state): State<SharedState>,
    AuthUser(_user): AuthUser,
    Json(payload): Json<EnrichMatchRequest>,
) -> Result<Json<EnrichMatchResponse>, AppError> {
    Ok(Json(
        match_service::enrich(&state, payload.match_id.as_deref()).await?,
    ))
}

/// Last five meetings between two synced teams.
#[utoipa::path(
    post,
    path = "/functions/getTeamH2H",
    tag = "football",
    request_body = HeadToHeadRequest,
    responses(
        (status = 200, description = "Head-to-head summary", body = HeadToHeadResponse),
        (status = 500, description = "API key not configured", body = ErrorBody)
    )
)]
pub async fn get_team_h2h(
    State(state): State<SharedState>,
    AuthUser(_user): AuthUser,
    Json(payload): Json<HeadToHeadRequest>,
) -> Result<Json<HeadToHeadResponse>, AppError> {
    let home = payload.home_team.unwrap_or_default();
    let away = payload.away_team.unwrap_or_default();
    Ok(Json(football_service::team_h2h(&state, &home, &away).await?))
}

/// Import upcoming fixtures of the configured leagues.
#[utoipa::path(
    post,
    path = "/functions/loadRealMatches",
    tag = "football",
    responses(
        (status = 200, description = "Fixtures imported", body = LoadMatchesResponse),
        (status = 403, description = "Admin role required", body = ErrorBody)
    )
)]
pub async fn load_real_matches(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<LoadMatchesResponse>, AppError> {
    info!(admin = %admin.email, "fixture import requested");
    Ok(Json(football_service::load_real_matches(&state).await?))
}

/// Refresh one league table and its team statistics.
#[utoipa::path(
    post,
    path = "/functions/syncFootballData",
    tag = "football",
    request_body = SyncLeagueRequest,
    responses(
        (status = 200, description = "League synced", body = SyncLeagueResponse),
        (status = 400, description = "League not supported", body = ErrorBody),
        (status = 403, description = "Admin role required", body = ErrorBody)
    )
)]
pub async fn sync_football_data(
    State(state): State<SharedState>,
    AdminUser(_admin): AdminUser,
    Json(payload): Json<SyncLeagueRequest>,
) -> Result<Json<SyncLeagueResponse>, AppError> {
    Ok(Json(
        football_service::sync_league(&state, payload.league.as_deref()).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/functions/syncAllLeagues",
    tag = "football",
    responses(
        (status = 200, description = "Per-league sync results", body = SyncAllResponse),
        (status = 403, description = "Admin role required", body = ErrorBody)
    )
)]
pub async fn sync_all_leagues(
    State(state): State<SharedState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<SyncAllResponse>, AppError> {
    Ok(Json(football_service::sync_all_leagues(&state).await?))
}

/// Alert fans whose favourite team plays within 24 hours.
#[utoipa::path(
    post,
    path = "/functions/notifyFavoriteTeams",
    tag = "notifications",
    responses(
        (status = 200, description = "Notifications sent", body = NotifyFavoritesResponse),
        (status = 403, description = "Admin role required", body = ErrorBody)
    )
)]
pub async fn notify_favorite_teams(
    State(state): State<SharedState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<NotifyFavoritesResponse>, AppError> {
    Ok(Json(notification_service::notify_favorite_teams(&state).await?))
}

/// Count today's visit towards the caller's streak.
#[utoipa::path(
    post,
    path = "/functions/trackVisit",
    tag = "gamification",
    responses(
        (status = 200, description = "Current streak", body = TrackVisitResponse),
        (status = 401, description = "Not signed in", body = ErrorBody)
    )
)]
pub async fn track_visit(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
) -> Result<Json<TrackVisitResponse>, AppError> {
    Ok(Json(
        stats_service::track_visit(&state, &user.email, user.full_name.clone()).await?,
    ))
}

/// Record a resolved prediction of the caller.
#[utoipa::path(
    post,
    path = "/functions/updateUserStats",
    tag = "gamification",
    request_body = UpdateStatsRequest,
    responses(
        (status = 200, description = "Updated counters", body = UpdateStatsResponse),
        (status = 401, description = "Not signed in", body = ErrorBody)
    )
)]
pub async fn update_user_stats(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<UpdateStatsRequest>,
) -> Result<Json<UpdateStatsResponse>, AppError> {
    let result = stats_service::parse_prediction_result(payload.prediction_result.as_deref());
    Ok(Json(
        stats_service::update_user_stats(&state, &user.email, user.full_name.clone(), result)
            .await?,
    ))
}

/// Run a result reconciliation pass immediately.
#[utoipa::path(
    post,
    path = "/functions/autoUpdateResults",
    tag = "football",
    responses(
        (status = 200, description = "Reconciliation report", body = ReconcileReport),
        (status = 409, description = "A pass is already running", body = ErrorBody)
    )
)]
pub async fn auto_update_results(
    State(state): State<SharedState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<ReconcileReport>, AppError> {
    Ok(Json(reconciler::trigger(&state).await?))
}
