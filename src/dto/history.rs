use serde::Serialize;
use utoipa::ToSchema;

use crate::dao::models::PredictionHistoryEntity;

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    pub entries: Vec<PredictionHistoryEntity>,
    pub summary: HistorySummary,
}

/// Aggregates over a user's predictions. Rates are rounded percentages.
#[derive(Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct HistorySummary {
    pub total: usize,
    pub wins: usize,
    pub losses: usize,
    pub pending: usize,
    /// Over resolved predictions only.
    pub win_rate: u32,
    /// Premium only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HistoryDetails>,
}

#[derive(Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct HistoryDetails {
    pub total_profit: f64,
    /// Profit of predictions made during the current calendar month.
    pub monthly_profit: f64,
    pub average_winning_odds: f64,
    /// Win rate of resolved predictions with confidence of 75 or more.
    pub high_confidence_win_rate: u32,
    /// Best leagues first.
    pub leagues: Vec<LeagueWinRate>,
}

#[derive(Debug, PartialEq, Serialize, ToSchema)]
pub struct LeagueWinRate {
    pub league: String,
    pub total: usize,
    pub wins: usize,
    pub win_rate: u32,
}
