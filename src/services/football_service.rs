//! football-data.org backed handlers: fixtures import, standings sync and head-to-head.

use std::collections::HashSet;

use time::{Date, Duration as TimeDuration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{LeagueStandingEntity, MatchEntity, StandingRow, TeamStatsEntity},
        repository::SortOrder,
    },
    dto::functions::{
        HeadToHeadResponse, LeagueSyncResult, LoadMatchesResponse, SyncAllResponse,
        SyncLeagueResponse,
    },
    error::ServiceError,
    integrations::{
        error::UpstreamError,
        football_data::{FdMatch, FdTableRow},
    },
    services::rfc3339,
    state::SharedState,
};

const DEFAULT_SEASON: &str = "2024/2025";
const IMPORT_WINDOW: TimeDuration = TimeDuration::days(14);
/// Latest matches checked for already imported fixtures.
const DEDUP_SCAN_LIMIT: usize = 500;
const TEAM_MATCHES_LIMIT: u32 = 100;
const HEAD_TO_HEAD_LIMIT: usize = 5;

fn ensure_configured(state: &SharedState) -> Result<(), ServiceError> {
    if state.integrations().football.is_configured() {
        Ok(())
    } else {
        Err(ServiceError::Configuration("API key not configured".into()))
    }
}

/// Pass non-2xx statuses through to the caller with a fixed message.
fn upstream(err: UpstreamError, message: &str) -> ServiceError {
    match err.status() {
        Some(status) => {
            warn!(%status, error = %err, "football-data.org rejected the request");
            ServiceError::Upstream {
                status,
                message: message.into(),
            }
        }
        None => err.into(),
    }
}

/// Last meetings of two synced teams.
pub async fn team_h2h(
    state: &SharedState,
    home_team: &str,
    away_team: &str,
) -> Result<HeadToHeadResponse, ServiceError> {
    ensure_configured(state)?;

    let repo = state.repo::<TeamStatsEntity>().await?;
    let home_id = repo
        .find_first(|team| team.team_name == home_team)
        .await?
        .and_then(|team| team.external_id);
    let away_id = repo
        .find_first(|team| team.team_name == away_team)
        .await?
        .and_then(|team| team.external_id);

    let (Some(home_id), Some(away_id)) = (home_id, away_id) else {
        return Ok(HeadToHeadResponse {
            success: false,
            matches: None,
            summary: None,
            detailed_matches: None,
            message: Some("Team IDs not found. Please sync data first.".into()),
        });
    };

    let fixtures = state
        .integrations()
        .football
        .team_matches(home_id, TEAM_MATCHES_LIMIT)
        .await
        .map_err(|err| upstream(err, "Failed to fetch H2H data"))?;

    let meetings: Vec<FdMatch> = fixtures
        .into_iter()
        .filter(|fixture| fixture.opposes(home_id, away_id))
        .take(HEAD_TO_HEAD_LIMIT)
        .collect();

    Ok(HeadToHeadResponse {
        success: true,
        matches: Some(meetings.len()),
        summary: Some(meetings.iter().map(FdMatch::summary_line).collect()),
        detailed_matches: Some(meetings),
        message: None,
    })
}

fn to_upcoming(league: &str, fixture: FdMatch) -> MatchEntity {
    let mut entity = MatchEntity::upcoming(
        fixture.home_team.name,
        fixture.away_team.name,
        league,
        fixture.utc_date,
    );
    entity.logo_home = fixture.home_team.crest;
    entity.logo_away = fixture.away_team.crest;
    entity.external_id = Some(format!("fbd-{}", fixture.id));
    entity
}

/// Import the fixtures of the next two weeks for every configured league.
pub async fn load_real_matches(state: &SharedState) -> Result<LoadMatchesResponse, ServiceError> {
    load_real_matches_from(state, OffsetDateTime::now_utc().date()).await
}

pub(crate) async fn load_real_matches_from(
    state: &SharedState,
    today: Date,
) -> Result<LoadMatchesResponse, ServiceError> {
    ensure_configured(state)?;
    let repo = state.repo::<MatchEntity>().await?;
    let config = state.config();
    let until = today + IMPORT_WINDOW;

    let mut fetched = Vec::new();
    for league in &config.fixture_leagues {
        let Some(code) = config.competition_code(league) else {
            warn!(%league, "no competition code configured; skipping");
            continue;
        };
        match state
            .integrations()
            .football
            .competition_matches(code.to_string(), today, until)
            .await
        {
            Ok(fixtures) => {
                fetched.extend(fixtures.into_iter().map(|fixture| to_upcoming(league, fixture)))
            }
            Err(err) => warn!(%league, error = %err, "failed to load fixtures"),
        }
    }

    let existing: HashSet<String> = repo
        .list_sorted(|m| m.match_date, SortOrder::Descending, DEDUP_SCAN_LIMIT)
        .await?
        .into_iter()
        .filter_map(|m| m.external_id)
        .collect();

    let total_matches = fetched.len();
    let fresh: Vec<MatchEntity> = fetched
        .into_iter()
        .filter(|m| {
            m.external_id
                .as_ref()
                .is_none_or(|external_id| !existing.contains(external_id))
        })
        .collect();
    let new_matches = repo.bulk_create(fresh).await?;

    info!(total_matches, new_matches, "fixtures imported");
    Ok(LoadMatchesResponse {
        success: true,
        total_matches,
        new_matches,
        loaded_at: rfc3339(OffsetDateTime::now_utc()),
    })
}

fn standing_row(row: &FdTableRow) -> StandingRow {
    StandingRow {
        position: row.position,
        team_name: row.team.name.clone(),
        played: row.played_games,
        won: row.won,
        draw: row.draw,
        lost: row.lost,
        points: row.points,
        goals_for: row.goals_for,
        goals_against: row.goals_against,
        goal_difference: row.goal_difference,
    }
}

/// Refresh the league table and per-team figures of `league`.
pub async fn sync_league(
    state: &SharedState,
    league: Option<&str>,
) -> Result<SyncLeagueResponse, ServiceError> {
    ensure_configured(state)?;
    let league = league.unwrap_or_default();
    let code = state
        .config()
        .competition_code(league)
        .ok_or_else(|| ServiceError::InvalidInput("League not supported".into()))?;

    let standings = state
        .integrations()
        .football
        .standings(code.to_string())
        .await
        .map_err(|err| upstream(err, "Failed to fetch data"))?;

    let now = OffsetDateTime::now_utc();
    let season = standings
        .season_label()
        .unwrap_or_else(|| DEFAULT_SEASON.to_string());
    let table = standings.table();

    let standing_repo = state.repo::<LeagueStandingEntity>().await?;
    let existing = standing_repo
        .find_first(|s| s.league == league && s.season == season)
        .await?;
    let standing = LeagueStandingEntity {
        id: existing.map_or_else(Uuid::new_v4, |s| s.id),
        league: league.to_string(),
        season,
        standings: table.iter().map(standing_row).collect(),
        last_updated: now,
    };
    standing_repo.update(&standing).await?;

    let team_repo = state.repo::<TeamStatsEntity>().await?;
    for row in table {
        let existing = team_repo
            .find_first(|t| t.team_name == row.team.name && t.league == league)
            .await?;
        let team = TeamStatsEntity {
            id: existing.map_or_else(Uuid::new_v4, |t| t.id),
            team_name: row.team.name.clone(),
            league: league.to_string(),
            external_id: Some(row.team.id),
            logo_url: row.team.crest.clone(),
            form: Some(row.form.clone().unwrap_or_default()),
            wins: row.won,
            draws: row.draw,
            losses: row.lost,
            goals_for: row.goals_for,
            goals_against: row.goals_against,
            points: row.points,
            position: row.position,
            played_games: row.played_games,
            last_updated: now,
        };
        team_repo.update(&team).await?;
    }

    info!(%league, teams = table.len(), "league standings synced");
    Ok(SyncLeagueResponse {
        success: true,
        league: league.to_string(),
        teams_updated: table.len(),
        last_updated: rfc3339(now),
    })
}

/// Sync every configured standings league in order, collecting per-league outcomes.
pub async fn sync_all_leagues(state: &SharedState) -> Result<SyncAllResponse, ServiceError> {
    let leagues = state.config().standings_leagues.clone();
    let mut results = Vec::with_capacity(leagues.len());

    for league in &leagues {
        match sync_league(state, Some(league)).await {
            Ok(data) => results.push(LeagueSyncResult {
                league: league.clone(),
                success: true,
                data: Some(data),
                error: None,
            }),
            Err(err) => {
                warn!(%league, error = %err, "league sync failed");
                results.push(LeagueSyncResult {
                    league: league.clone(),
                    success: false,
                    data: None,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    Ok(SyncAllResponse {
        success: true,
        total_leagues: leagues.len(),
        results,
        synced_at: rfc3339(OffsetDateTime::now_utc()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        integrations::football_data::{FdGoals, FdScore, FdSeason, FdStandings, FdTeam},
        testing::TestContext,
    };
    use axum::http::StatusCode;
    use time::macros::{date, datetime};

    fn team(id: u64, name: &str) -> FdTeam {
        FdTeam {
            id,
            name: name.into(),
            crest: Some(format!("{id}.png")),
        }
    }

    fn fixture(id: u64, home: FdTeam, away: FdTeam, goals: (u32, u32)) -> FdMatch {
        FdMatch {
            id,
            utc_date: datetime!(2025-03-08 20:00 UTC),
            status: Some("FINISHED".into()),
            home_team: home,
            away_team: away,
            score: FdScore {
                full_time: FdGoals {
                    home: Some(goals.0),
                    away: Some(goals.1),
                },
            },
        }
    }

    fn row(position: u32, team: FdTeam, points: i32) -> FdTableRow {
        FdTableRow {
            position,
            team,
            played_games: 10,
            form: None,
            won: 6,
            draw: 2,
            lost: 2,
            points,
            goals_for: 18,
            goals_against: 9,
            goal_difference: 9,
        }
    }

    #[tokio::test]
    async fn sync_upserts_standings_and_team_stats() {
        let ctx = TestContext::new().await;
        let table = vec![
            row(1, team(524, "Paris Saint-Germain FC"), 25),
            row(2, team(516, "Olympique de Marseille"), 20),
        ];
        ctx.football.standings.lock().unwrap().insert(
            "FL1".into(),
            FdStandings::from_parts(
                Some(FdSeason {
                    start_date: Some("2025-08-15".into()),
                    end_date: Some("2026-05-17".into()),
                }),
                table,
            ),
        );

        let first = sync_league(&ctx.state, Some("Ligue 1")).await.unwrap();
        assert_eq!(first.teams_updated, 2);
        sync_league(&ctx.state, Some("Ligue 1")).await.unwrap();

        let standings = ctx.repo::<LeagueStandingEntity>().await.list().await.unwrap();
        assert_eq!(standings.len(), 1);
        assert_eq!(standings[0].season, "2025/2026");

        let teams = ctx.repo::<TeamStatsEntity>().await.list().await.unwrap();
        assert_eq!(teams.len(), 2);
        let psg = teams.iter().find(|t| t.external_id == Some(524)).unwrap();
        assert_eq!(psg.form.as_deref(), Some(""));
        assert_eq!(psg.logo_url.as_deref(), Some("524.png"));
    }

    #[tokio::test]
    async fn sync_rejects_unknown_league_and_forwards_status() {
        let ctx = TestContext::new().await;
        assert!(matches!(
            sync_league(&ctx.state, Some("Eredivisie")).await,
            Err(ServiceError::InvalidInput(message)) if message == "League not supported"
        ));

        ctx.football
            .failing_codes
            .lock()
            .unwrap()
            .insert("PL".into(), StatusCode::TOO_MANY_REQUESTS);
        match sync_league(&ctx.state, Some("Premier League")).await {
            Err(ServiceError::Upstream { status, message }) => {
                assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
                assert_eq!(message, "Failed to fetch data");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn sync_all_reports_each_league() {
        let ctx = TestContext::new().await;
        ctx.football.standings.lock().unwrap().insert(
            "FL1".into(),
            FdStandings::from_parts(None, vec![row(1, team(1, "A"), 3)]),
        );

        let report = sync_all_leagues(&ctx.state).await.unwrap();
        assert_eq!(report.total_leagues, 5);
        assert!(report.results[0].success);
        assert_eq!(
            report.results[0].data.as_ref().map(|d| d.teams_updated),
            Some(1)
        );
        assert!(report.results[1..].iter().all(|r| !r.success && r.error.is_some()));

        let standing = ctx.repo::<LeagueStandingEntity>().await.list().await.unwrap();
        assert_eq!(standing[0].season, DEFAULT_SEASON);
    }

    #[tokio::test]
    async fn load_skips_already_imported_fixtures() {
        let ctx = TestContext::new().await;
        let psg = team(524, "Paris Saint-Germain FC");
        let om = team(516, "Olympique de Marseille");
        ctx.football.fixtures.lock().unwrap().insert(
            "FL1".into(),
            vec![
                fixture(1, psg.clone(), om.clone(), (0, 0)),
                fixture(2, om, psg, (0, 0)),
            ],
        );
        ctx.football
            .failing_codes
            .lock()
            .unwrap()
            .insert("PL".into(), StatusCode::INTERNAL_SERVER_ERROR);

        let first = load_real_matches_from(&ctx.state, date!(2025 - 03 - 01))
            .await
            .unwrap();
        assert_eq!((first.total_matches, first.new_matches), (2, 2));

        let second = load_real_matches_from(&ctx.state, date!(2025 - 03 - 01))
            .await
            .unwrap();
        assert_eq!((second.total_matches, second.new_matches), (2, 0));

        let stored = ctx.repo::<MatchEntity>().await.list().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().any(|m| m.external_id.as_deref() == Some("fbd-1")));
        assert!(!ctx.football.calls.lock().unwrap().contains(&"EL".to_string()));
    }

    #[tokio::test]
    async fn head_to_head_keeps_five_meetings() {
        let ctx = TestContext::new().await;
        let psg = team(524, "Paris Saint-Germain FC");
        let om = team(516, "Olympique de Marseille");
        let other = team(1, "Other");

        let mut fixtures: Vec<FdMatch> = (0..6)
            .map(|i| fixture(i, psg.clone(), om.clone(), (2, 1)))
            .collect();
        fixtures.insert(0, fixture(99, psg.clone(), other, (5, 0)));
        ctx.football.team_fixtures.lock().unwrap().insert(524, fixtures);

        let teams = ctx.repo::<TeamStatsEntity>().await;
        for (row_team, position) in [(psg, 1), (om, 2)] {
            let now = OffsetDateTime::now_utc();
            teams
                .create(TeamStatsEntity {
                    id: Uuid::new_v4(),
                    team_name: row_team.name,
                    league: "Ligue 1".into(),
                    external_id: Some(row_team.id),
                    logo_url: None,
                    form: None,
                    wins: 0,
                    draws: 0,
                    losses: 0,
                    goals_for: 0,
                    goals_against: 0,
                    points: 0,
                    position,
                    played_games: 0,
                    last_updated: now,
                })
                .await
                .unwrap();
        }

        let response = team_h2h(&ctx.state, "Paris Saint-Germain FC", "Olympique de Marseille")
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.matches, Some(5));
        assert_eq!(
            response.summary.unwrap()[0],
            "Paris Saint-Germain FC 2-1 Olympique de Marseille"
        );
    }

    #[tokio::test]
    async fn head_to_head_requires_synced_teams() {
        let ctx = TestContext::new().await;
        let response = team_h2h(&ctx.state, "A", "B").await.unwrap();
        assert!(!response.success);
        assert_eq!(
            response.message.as_deref(),
            Some("Team IDs not found. Please sync data first.")
        );
    }
}
