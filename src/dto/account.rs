//! Per-user account views: subscription, favourites and leaderboard.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::dao::models::{Badge, SubscriptionEntity};

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionStatusResponse {
    pub subscription: Option<SubscriptionEntity>,
    pub is_premium: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct FavoriteTeamRequest {
    #[validate(length(min = 1, max = 120))]
    pub team_name: String,
    #[serde(default)]
    pub league: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub display_name: String,
    pub points: u32,
    pub level: u32,
    pub total_wins: u32,
    pub total_predictions: u32,
    pub badges: Vec<Badge>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntry>,
    /// Caller's rank when they appear in the table.
    pub my_rank: Option<usize>,
}
