//! Match catalogue requests and responses.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    dao::models::{MatchEntity, MatchStatus, Odds, PredictionHistoryEntity, PredictionResult},
    dto::validation::validate_score,
};

/// Filters of `GET /api/matches`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MatchListQuery {
    pub status: Option<MatchStatus>,
    pub league: Option<String>,
    /// Defaults to 100.
    pub limit: Option<usize>,
}

/// Manual fixture creation by an administrator.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMatchRequest {
    #[validate(length(min = 1, max = 120))]
    pub home_team: String,
    #[validate(length(min = 1, max = 120))]
    pub away_team: String,
    #[validate(length(min = 1, max = 80))]
    pub league: String,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String)]
    pub match_date: OffsetDateTime,
    #[serde(default)]
    pub status: Option<MatchStatus>,
    #[serde(default)]
    pub logo_home: Option<String>,
    #[serde(default)]
    pub logo_away: Option<String>,
    #[serde(default)]
    pub odds_winamax: Option<Odds>,
    #[serde(default)]
    pub odds_betclic: Option<Odds>,
    #[serde(default)]
    pub odds_parionssport: Option<Odds>,
}

/// Admin entry of a final result.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateResultRequest {
    /// `"h-a"`, spaces around the dash allowed.
    #[validate(custom(function = "validate_score"))]
    pub final_score: String,
    /// Overrides the outcome computed from the score.
    #[serde(default)]
    pub result: Option<PredictionResult>,
}

/// Match after analysis together with the caller's new history entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnalysisResponse {
    #[serde(rename = "match")]
    pub match_: MatchEntity,
    pub history_entry: PredictionHistoryEntity,
}
