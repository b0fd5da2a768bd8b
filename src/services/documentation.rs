use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Prono Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::functions::create_checkout,
        crate::routes::functions::stripe_webhook,
        crate::routes::functions::enrich_match_data,
        crate::routes::functions::get_team_h2h,
        crate::routes::functions::load_real_matches,
        crate::routes::functions::sync_football_data,
        crate::routes::functions::sync_all_leagues,
        crate::routes::functions::notify_favorite_teams,
        crate::routes::functions::track_visit,
        crate::routes::functions::update_user_stats,
        crate::routes::functions::auto_update_results,
        crate::routes::api::list_matches,
        crate::routes::api::create_match,
        crate::routes::api::analyze_match,
        crate::routes::api::refresh_live,
        crate::routes::api::update_result,
        crate::routes::api::history,
        crate::routes::api::leaderboard,
        crate::routes::api::subscription,
        crate::routes::api::list_favorites,
        crate::routes::api::add_favorite,
        crate::routes::api::remove_favorite,
        crate::routes::notifications::list_notifications,
        crate::routes::notifications::mark_read,
        crate::routes::notifications::stream_notifications,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::dto::health::HealthResponse,
            crate::dto::health::IntegrationStatus,
            crate::dto::functions::CheckoutRequest,
            crate::dto::functions::CheckoutResponse,
            crate::dto::functions::WebhookAck,
            crate::dto::functions::EnrichMatchRequest,
            crate::dto::functions::EnrichMatchResponse,
            crate::dto::functions::HeadToHeadRequest,
            crate::dto::functions::HeadToHeadResponse,
            crate::dto::functions::LoadMatchesResponse,
            crate::dto::functions::SyncLeagueRequest,
            crate::dto::functions::SyncLeagueResponse,
            crate::dto::functions::LeagueSyncResult,
            crate::dto::functions::SyncAllResponse,
            crate::dto::functions::NotifyFavoritesResponse,
            crate::dto::functions::TrackVisitResponse,
            crate::dto::functions::UpdateStatsRequest,
            crate::dto::functions::UpdateStatsResponse,
            crate::dto::functions::ReconcileReport,
            crate::dto::matches::CreateMatchRequest,
            crate::dto::matches::UpdateResultRequest,
            crate::dto::matches::AnalysisResponse,
            crate::dto::history::HistoryResponse,
            crate::dto::history::HistorySummary,
            crate::dto::history::HistoryDetails,
            crate::dto::history::LeagueWinRate,
            crate::dto::account::SubscriptionStatusResponse,
            crate::dto::account::FavoriteTeamRequest,
            crate::dto::account::LeaderboardEntry,
            crate::dto::account::LeaderboardResponse,
            crate::dao::models::MatchEntity,
            crate::dao::models::MatchStatus,
            crate::dao::models::PredictionResult,
            crate::dao::models::Prediction,
            crate::dao::models::Odds,
            crate::dao::models::PredictionHistoryEntity,
            crate::dao::models::Badge,
            crate::dao::models::NotificationEntity,
            crate::dao::models::NotificationKind,
            crate::dao::models::NotificationPriority,
            crate::dao::models::SubscriptionEntity,
            crate::dao::models::SubscriptionPlan,
            crate::dao::models::SubscriptionStatus,
            crate::dao::models::FavoriteTeamEntity,
            crate::dao::models::TeamStatsEntity,
            crate::integrations::football_data::FdMatch,
            crate::integrations::football_data::FdTeam,
            crate::integrations::football_data::FdScore,
            crate::integrations::football_data::FdGoals,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "billing", description = "Stripe checkout, webhook and subscription status"),
        (name = "football", description = "football-data.org sync, enrichment and reconciliation"),
        (name = "gamification", description = "Visit streaks, points and badges"),
        (name = "matches", description = "Match catalogue and AI predictions"),
        (name = "history", description = "Prediction history and leaderboard"),
        (name = "favorites", description = "Followed teams"),
        (name = "notifications", description = "User notifications and their live stream"),
    )
)]
pub struct ApiDoc;
