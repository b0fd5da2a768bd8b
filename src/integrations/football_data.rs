//! football-data.org v4 client.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use time::{Date, OffsetDateTime};
use tracing::debug;
use utoipa::ToSchema;

use super::{
    error::{UpstreamError, UpstreamResult, ensure_success},
    pacer::RequestPacer,
};

const SERVICE: &str = "football-data.org";
const DEFAULT_BASE_URL: &str = "https://api.football-data.org/v4";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Reference to a team inside a fixture or a table row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FdTeam {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub crest: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct FdGoals {
    #[serde(default)]
    pub home: Option<u32>,
    #[serde(default)]
    pub away: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FdScore {
    #[serde(default)]
    pub full_time: FdGoals,
}

/// Fixture as returned by the `/matches` endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FdMatch {
    pub id: u64,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String)]
    pub utc_date: OffsetDateTime,
    #[serde(default)]
    pub status: Option<String>,
    pub home_team: FdTeam,
    pub away_team: FdTeam,
    #[serde(default)]
    pub score: FdScore,
}

impl FdMatch {
    /// Whether this fixture opposes the two teams, in either order.
    pub fn opposes(&self, first: u64, second: u64) -> bool {
        (self.home_team.id == first && self.away_team.id == second)
            || (self.home_team.id == second && self.away_team.id == first)
    }

    /// `"<home> <h>-<a> <away>"`, with `null` for unknown goals.
    pub fn summary_line(&self) -> String {
        let goals = |value: Option<u32>| value.map_or_else(|| "null".to_string(), |g| g.to_string());
        format!(
            "{} {}-{} {}",
            self.home_team.name,
            goals(self.score.full_time.home),
            goals(self.score.full_time.away),
            self.away_team.name
        )
    }
}

#[derive(Debug, Deserialize)]
struct MatchesResponse {
    #[serde(default)]
    matches: Vec<FdMatch>,
}

/// One row of a competition table.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FdTableRow {
    pub position: u32,
    pub team: FdTeam,
    pub played_games: u32,
    #[serde(default)]
    pub form: Option<String>,
    pub won: u32,
    pub draw: u32,
    pub lost: u32,
    pub points: i32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_difference: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FdSeason {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

impl FdSeason {
    /// `YYYY/YYYY` label built from the season boundaries.
    pub fn label(&self) -> Option<String> {
        let start = self.start_date.as_deref()?.get(..4)?;
        let end = self.end_date.as_deref()?.get(..4)?;
        Some(format!("{start}/{end}"))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct FdStandingGroup {
    #[serde(default)]
    table: Vec<FdTableRow>,
}

/// Payload of `/competitions/{code}/standings`.
#[derive(Debug, Clone, Deserialize)]
pub struct FdStandings {
    #[serde(default)]
    pub season: Option<FdSeason>,
    #[serde(default)]
    standings: Vec<FdStandingGroup>,
}

impl FdStandings {
    /// Rows of the overall table (first standings group).
    pub fn table(&self) -> &[FdTableRow] {
        self.standings
            .first()
            .map(|group| group.table.as_slice())
            .unwrap_or_default()
    }

    pub fn season_label(&self) -> Option<String> {
        self.season.as_ref().and_then(FdSeason::label)
    }

    #[cfg(test)]
    pub(crate) fn from_parts(season: Option<FdSeason>, table: Vec<FdTableRow>) -> Self {
        Self {
            season,
            standings: vec![FdStandingGroup { table }],
        }
    }
}

/// Read access to football-data.org used by the sync and head-to-head handlers.
pub trait FootballDataApi: Send + Sync {
    /// Whether an API token is available.
    fn is_configured(&self) -> bool;

    fn competition_matches(
        &self,
        code: String,
        from: Date,
        to: Date,
    ) -> BoxFuture<'static, UpstreamResult<Vec<FdMatch>>>;

    fn standings(&self, code: String) -> BoxFuture<'static, UpstreamResult<FdStandings>>;

    fn team_matches(&self, team_id: u64, limit: u32)
    -> BoxFuture<'static, UpstreamResult<Vec<FdMatch>>>;
}

/// reqwest implementation authenticated with the `X-Auth-Token` header.
#[derive(Clone)]
pub struct FootballDataClient {
    http: Client,
    base_url: Arc<str>,
    api_key: Option<Arc<str>>,
    pacer: Arc<RequestPacer>,
}

impl FootballDataClient {
    pub fn new(api_key: Option<String>, pacer: Arc<RequestPacer>) -> UpstreamResult<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| UpstreamError::ClientBuilder {
                service: SERVICE,
                source,
            })?;
        Ok(Self {
            http,
            base_url: Arc::from(DEFAULT_BASE_URL),
            api_key: api_key.map(Arc::from),
            pacer,
        })
    }

    async fn get_json<T>(self, path: String, query: Vec<(&'static str, String)>) -> UpstreamResult<T>
    where
        T: DeserializeOwned,
    {
        let api_key = self
            .api_key
            .clone()
            .ok_or(UpstreamError::MissingCredentials { service: SERVICE })?;

        self.pacer.wait_turn().await;
        debug!(%path, "calling football-data.org");

        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header("X-Auth-Token", api_key.as_ref())
            .query(&query)
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                service: SERVICE,
                source,
            })?;

        ensure_success(SERVICE, response)
            .await?
            .json::<T>()
            .await
            .map_err(|source| UpstreamError::Decode {
                service: SERVICE,
                source,
            })
    }
}

impl FootballDataApi for FootballDataClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn competition_matches(
        &self,
        code: String,
        from: Date,
        to: Date,
    ) -> BoxFuture<'static, UpstreamResult<Vec<FdMatch>>> {
        let client = self.clone();
        Box::pin(async move {
            let query = vec![("dateFrom", from.to_string()), ("dateTo", to.to_string())];
            let payload: MatchesResponse = client
                .get_json(format!("/competitions/{code}/matches"), query)
                .await?;
            Ok(payload.matches)
        })
    }

    fn standings(&self, code: String) -> BoxFuture<'static, UpstreamResult<FdStandings>> {
        let client = self.clone();
        Box::pin(async move {
            client
                .get_json(format!("/competitions/{code}/standings"), Vec::new())
                .await
        })
    }

    fn team_matches(
        &self,
        team_id: u64,
        limit: u32,
    ) -> BoxFuture<'static, UpstreamResult<Vec<FdMatch>>> {
        let client = self.clone();
        Box::pin(async move {
            let payload: MatchesResponse = client
                .get_json(
                    format!("/teams/{team_id}/matches"),
                    vec![("limit", limit.to_string())],
                )
                .await?;
            Ok(payload.matches)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_fixture_and_formats_summary() {
        let fixture: FdMatch = serde_json::from_value(json!({
            "id": 42,
            "utcDate": "2025-04-12T19:00:00Z",
            "status": "FINISHED",
            "homeTeam": {"id": 524, "name": "Paris Saint-Germain FC", "crest": "psg.png"},
            "awayTeam": {"id": 516, "name": "Olympique de Marseille"},
            "score": {"fullTime": {"home": 3, "away": 1}}
        }))
        .unwrap();

        assert!(fixture.opposes(516, 524));
        assert!(!fixture.opposes(516, 1));
        assert_eq!(
            fixture.summary_line(),
            "Paris Saint-Germain FC 3-1 Olympique de Marseille"
        );
    }

    #[test]
    fn standings_expose_first_table_and_season() {
        let standings: FdStandings = serde_json::from_value(json!({
            "season": {"startDate": "2025-08-15", "endDate": "2026-05-17"},
            "standings": [{"table": [{
                "position": 1,
                "team": {"id": 57, "name": "Arsenal FC", "crest": "ars.png"},
                "playedGames": 10, "form": "W,W,D", "won": 7, "draw": 2, "lost": 1,
                "points": 23, "goalsFor": 20, "goalsAgainst": 7, "goalDifference": 13
            }]}]
        }))
        .unwrap();

        assert_eq!(standings.season_label().as_deref(), Some("2025/2026"));
        assert_eq!(standings.table().len(), 1);
        assert_eq!(standings.table()[0].team.name, "Arsenal FC");
    }

    #[test]
    fn missing_standings_yield_empty_table() {
        let standings: FdStandings = serde_json::from_value(json!({})).unwrap();
        assert!(standings.table().is_empty());
        assert_eq!(standings.season_label(), None);
    }
}
