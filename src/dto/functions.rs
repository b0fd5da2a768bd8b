//! Request and response bodies of the `/functions/<name>` endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{dao::models::TeamStatsEntity, integrations::football_data::FdMatch};

/// Body of `createCheckout`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CheckoutRequest {
    /// `monthly` or `yearly`.
    pub plan: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    /// Hosted Stripe Checkout page.
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct EnrichMatchRequest {
    #[serde(rename = "matchId")]
    pub match_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnrichMatchResponse {
    pub success: bool,
    pub enriched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_stats: Option<TeamStatsEntity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub away_stats: Option<TeamStatsEntity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct HeadToHeadRequest {
    #[serde(rename = "homeTeam")]
    pub home_team: Option<String>,
    #[serde(rename = "awayTeam")]
    pub away_team: Option<String>,
}

/// Last meetings between two teams, or `success: false` with a message when
/// the teams were never synced.
#[derive(Debug, Serialize, ToSchema)]
pub struct HeadToHeadResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_matches: Option<Vec<FdMatch>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoadMatchesResponse {
    pub success: bool,
    pub total_matches: usize,
    pub new_matches: usize,
    pub loaded_at: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct SyncLeagueRequest {
    pub league: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SyncLeagueResponse {
    pub success: bool,
    pub league: String,
    pub teams_updated: usize,
    pub last_updated: String,
}

/// Outcome of one league inside `syncAllLeagues`.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeagueSyncResult {
    pub league: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<SyncLeagueResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SyncAllResponse {
    pub success: bool,
    pub results: Vec<LeagueSyncResult>,
    pub total_leagues: usize,
    pub synced_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotifyFavoritesResponse {
    pub success: bool,
    #[serde(rename = "notificationsSent")]
    pub notifications_sent: usize,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrackVisitResponse {
    pub streak: u32,
    #[serde(rename = "isNew")]
    pub is_new: bool,
    /// Messages of the badges unlocked by this visit.
    #[serde(rename = "newBadges", skip_serializing_if = "Option::is_none")]
    pub new_badges: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpdateStatsRequest {
    /// `win` for a successful prediction; anything else counts as a miss.
    #[serde(rename = "predictionResult")]
    pub prediction_result: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpdateStatsResponse {
    pub success: bool,
    #[serde(rename = "newBadges")]
    pub new_badges: Vec<String>,
    pub points: u32,
    pub level: u32,
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReconcileReport {
    /// Matches past their grace period that were looked up.
    pub checked: usize,
    pub finished: usize,
    pub failed: usize,
}
