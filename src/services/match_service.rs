//! Match catalogue: listing with the free-tier limit, manual creation,
//! statistics enrichment, AI analysis, live refresh and result settlement.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::{Value, json};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{
            MatchEntity, MatchStatus, NotificationEntity, NotificationKind, Odds, Prediction,
            PredictionHistoryEntity, PredictionResult, TeamStatsEntity,
        },
        repository::{SortOrder, sort_by_key},
    },
    dto::{
        functions::EnrichMatchResponse,
        matches::{AnalysisResponse, CreateMatchRequest, MatchListQuery, UpdateResultRequest},
    },
    error::ServiceError,
    integrations::{error::UpstreamError, identity::User, llm::LlmRequest},
    services::{
        notification_service,
        outcome::{self, FinalScore},
        stats_service, subscription_service,
    },
    state::SharedState,
};

const DEFAULT_LIST_LIMIT: usize = 100;
const HISTORY_CONTEXT_LIMIT: usize = 20;
const MIN_CONFIDENCE: f64 = 55.0;
const MAX_CONFIDENCE: f64 = 85.0;

fn parse_id(raw: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ServiceError::NotFound("Match not found".into()))
}

pub async fn get(state: &SharedState, id: Uuid) -> Result<MatchEntity, ServiceError> {
    state
        .repo::<MatchEntity>()
        .await?
        .get(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Match not found".into()))
}

/// Matches newest first. Without premium only the soonest upcoming fixtures stay visible.
pub async fn list(
    state: &SharedState,
    user: &User,
    query: &MatchListQuery,
) -> Result<Vec<MatchEntity>, ServiceError> {
    let repo = state.repo::<MatchEntity>().await?;
    let mut matches = repo
        .filter(|m| {
            query.status.is_none_or(|status| m.status == status)
                && query.league.as_deref().is_none_or(|league| m.league == league)
        })
        .await?;

    let unlocked = user.is_admin() || subscription_service::is_premium(state, &user.email).await?;
    if !unlocked {
        let mut upcoming: Vec<&MatchEntity> = matches
            .iter()
            .filter(|m| m.status == MatchStatus::Upcoming)
            .collect();
        upcoming.sort_by_key(|m| m.match_date);
        let visible: HashSet<Uuid> = upcoming
            .into_iter()
            .take(state.config().free_upcoming_limit)
            .map(|m| m.id)
            .collect();
        matches.retain(|m| m.status != MatchStatus::Upcoming || visible.contains(&m.id));
    }

    sort_by_key(&mut matches, |m| m.match_date, SortOrder::Descending);
    matches.truncate(query.limit.unwrap_or(DEFAULT_LIST_LIMIT));
    Ok(matches)
}

pub async fn create(
    state: &SharedState,
    request: CreateMatchRequest,
) -> Result<MatchEntity, ServiceError> {
    let mut entity = MatchEntity::upcoming(
        request.home_team.trim(),
        request.away_team.trim(),
        request.league.trim(),
        request.match_date,
    );
    entity.status = request.status.unwrap_or_default();
    entity.logo_home = request.logo_home;
    entity.logo_away = request.logo_away;
    entity.odds_winamax = request.odds_winamax;
    entity.odds_betclic = request.odds_betclic;
    entity.odds_parionssport = request.odds_parionssport;

    let created = state.repo::<MatchEntity>().await?.create(entity).await?;
    info!(match_id = %created.id, home = %created.home_team, away = %created.away_team, "match created");
    Ok(created)
}

fn stats_block(team: &str, stats: &TeamStatsEntity) -> String {
    format!(
        "**{team}** ({}e, {} pts)\n- Forme: {}\n- V-N-D: {}-{}-{}\n- Buts: {} marqués, {} encaissés\n\n",
        stats.position,
        stats.points,
        stats.form.as_deref().filter(|f| !f.is_empty()).unwrap_or("N/A"),
        stats.wins,
        stats.draws,
        stats.losses,
        stats.goals_for,
        stats.goals_against,
    )
}

/// Prepend league-table figures of both teams to the analysis of a match.
pub async fn enrich(
    state: &SharedState,
    match_id: Option<&str>,
) -> Result<EnrichMatchResponse, ServiceError> {
    let match_id = match_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ServiceError::InvalidInput("Match ID required".into()))?;
    let mut fixture = get(state, parse_id(match_id)?).await?;

    let teams = state.repo::<TeamStatsEntity>().await?;
    let home = teams
        .find_first(|t| t.team_name == fixture.home_team && t.league == fixture.league)
        .await?;
    let away = teams
        .find_first(|t| t.team_name == fixture.away_team && t.league == fixture.league)
        .await?;

    let (Some(home), Some(away)) = (home, away) else {
        return Ok(EnrichMatchResponse {
            success: true,
            enriched: false,
            home_stats: None,
            away_stats: None,
            message: Some("Team stats not found. Run syncFootballData first.".into()),
        });
    };

    let mut enriched = String::from("📊 **Statistiques enrichies**\n\n");
    enriched.push_str(&stats_block(&fixture.home_team, &home));
    enriched.push_str(&stats_block(&fixture.away_team, &away));
    enriched.push('\n');
    enriched.push_str(fixture.analysis.as_deref().unwrap_or_default());

    fixture.analysis = Some(enriched);
    if home.logo_url.is_some() {
        fixture.logo_home = home.logo_url.clone();
    }
    if away.logo_url.is_some() {
        fixture.logo_away = away.logo_url.clone();
    }
    state.repo::<MatchEntity>().await?.update(&fixture).await?;

    Ok(EnrichMatchResponse {
        success: true,
        enriched: true,
        home_stats: Some(home),
        away_stats: Some(away),
        message: None,
    })
}

fn result_label(result: PredictionResult) -> &'static str {
    match result {
        PredictionResult::Pending => "pending",
        PredictionResult::Win => "win",
        PredictionResult::Loss => "loss",
    }
}

fn analysis_prompt(fixture: &MatchEntity, recent: &[PredictionHistoryEntity]) -> String {
    let history = if recent.is_empty() {
        String::new()
    } else {
        let lines: Vec<String> = recent
            .iter()
            .map(|h| {
                format!(
                    "- {} vs {}: {}, {}",
                    h.home_team,
                    h.away_team,
                    h.prediction.as_str(),
                    result_label(h.result)
                )
            })
            .collect();
        format!("\n\nHistorique récent:\n{}", lines.join("\n"))
    };

    format!(
        "Analyse ce match de football:\n\n{} vs {}\n{} - {}\n\nRecherche:\n\
         1. Cotes actuelles (Winamax, Betclic, Parions Sport)\n\
         2. Blessés/Suspendus\n\
         3. Top 3 buteurs de chaque équipe\n\
         4. Forme des 5 derniers matchs\n\
         5. Confrontations directes\n{}\n\nAnalyse courte et pronostic précis.",
        fixture.home_team,
        fixture.away_team,
        fixture.league,
        super::rfc3339(fixture.match_date),
        history
    )
}

fn analysis_schema() -> Value {
    let odds = json!({
        "type": "object",
        "properties": {
            "home": {"type": "number"},
            "draw": {"type": "number"},
            "away": {"type": "number"}
        }
    });
    let predictions: Vec<&str> = Prediction::ALL.iter().map(|p| p.as_str()).collect();
    json!({
        "type": "object",
        "properties": {
            "prediction": {"type": "string", "enum": predictions},
            "confidence": {"type": "number"},
            "analysis": {"type": "string"},
            "key_injuries": {"type": "string"},
            "top_scorers_home": {"type": "string"},
            "top_scorers_away": {"type": "string"},
            "team_form": {"type": "string"},
            "odds_winamax": odds,
            "odds_betclic": odds,
            "odds_parionssport": odds
        },
        "required": ["prediction", "confidence", "analysis"]
    })
}

#[derive(Debug, Deserialize)]
struct AnalysisAnswer {
    prediction: Prediction,
    confidence: f64,
    analysis: String,
    #[serde(default)]
    key_injuries: Option<String>,
    #[serde(default)]
    top_scorers_home: Option<String>,
    #[serde(default)]
    top_scorers_away: Option<String>,
    #[serde(default)]
    team_form: Option<String>,
    #[serde(default)]
    odds_winamax: Option<Value>,
    #[serde(default)]
    odds_betclic: Option<Value>,
    #[serde(default)]
    odds_parionssport: Option<Value>,
}

/// Incomplete odds objects are dropped instead of failing the whole answer.
fn lenient_odds(value: Option<Value>) -> Option<Odds> {
    value.and_then(|v| serde_json::from_value(v).ok())
}

fn decode_answer<T: serde::de::DeserializeOwned>(answer: Value) -> Result<T, ServiceError> {
    serde_json::from_value(answer).map_err(|err| {
        ServiceError::UpstreamFailure(UpstreamError::Payload {
            service: "llm",
            message: err.to_string(),
        })
    })
}

/// Decimal odds a bookmaker offers for a 1X2 prediction, first bookmaker wins.
pub fn odds_for(fixture: &MatchEntity, prediction: Prediction) -> Option<f64> {
    [
        fixture.odds_winamax,
        fixture.odds_betclic,
        fixture.odds_parionssport,
    ]
    .into_iter()
    .flatten()
    .find_map(|odds| match prediction {
        Prediction::HomeWin => Some(odds.home),
        Prediction::Draw => Some(odds.draw),
        Prediction::AwayWin => Some(odds.away),
        _ => None,
    })
}

/// Ask the language model for a prediction and record it in the caller's history.
pub async fn analyze(
    state: &SharedState,
    user: &User,
    id: Uuid,
) -> Result<AnalysisResponse, ServiceError> {
    let mut fixture = get(state, id).await?;
    let history = state.repo::<PredictionHistoryEntity>().await?;

    let mut recent = history
        .filter(|h| h.user_email == user.email && h.result != PredictionResult::Pending)
        .await?;
    sort_by_key(&mut recent, |h| h.created_at, SortOrder::Descending);
    recent.truncate(HISTORY_CONTEXT_LIMIT);

    let answer = state
        .integrations()
        .llm
        .invoke(LlmRequest {
            prompt: analysis_prompt(&fixture, &recent),
            add_context_from_internet: true,
            response_json_schema: analysis_schema(),
        })
        .await?;
    let answer: AnalysisAnswer = decode_answer(answer)?;

    let confidence = answer.confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE).round() as u8;
    let details = json!({
        "analysis": answer.analysis,
        "injuries": answer.key_injuries,
        "scorers_home": answer.top_scorers_home,
        "scorers_away": answer.top_scorers_away,
        "form": answer.team_form,
    });

    fixture.prediction = Some(answer.prediction);
    fixture.confidence = Some(confidence);
    fixture.analysis = Some(details.to_string());
    fixture.odds_winamax = lenient_odds(answer.odds_winamax);
    fixture.odds_betclic = lenient_odds(answer.odds_betclic);
    fixture.odds_parionssport = lenient_odds(answer.odds_parionssport);
    state.repo::<MatchEntity>().await?.update(&fixture).await?;

    let entry = history
        .create(PredictionHistoryEntity {
            id: Uuid::new_v4(),
            user_email: user.email.clone(),
            match_id: fixture.id,
            home_team: fixture.home_team.clone(),
            away_team: fixture.away_team.clone(),
            league: fixture.league.clone(),
            match_date: fixture.match_date,
            prediction: answer.prediction,
            confidence,
            result: PredictionResult::Pending,
            final_score: None,
            odds: odds_for(&fixture, answer.prediction),
            profit: None,
            created_at: OffsetDateTime::now_utc(),
        })
        .await?;

    info!(match_id = %fixture.id, prediction = answer.prediction.as_str(), confidence, "match analysed");
    Ok(AnalysisResponse {
        match_: fixture,
        history_entry: entry,
    })
}

#[derive(Debug, Deserialize)]
struct LiveAnswer {
    #[serde(default)]
    live_score: Option<String>,
    #[serde(default)]
    live_minute: Option<f64>,
    #[serde(default)]
    recent_events: Option<Vec<Value>>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    momentum: Option<String>,
}

/// Refresh the live score, minute and events of a match.
pub async fn refresh_live(state: &SharedState, id: Uuid) -> Result<MatchEntity, ServiceError> {
    let mut fixture = get(state, id).await?;
    if fixture.status == MatchStatus::Finished {
        return Err(ServiceError::Conflict("Match already finished".into()));
    }

    let prompt = format!(
        "Analyse live: {} vs {}\nScore actuel: {}\nMinute: {}'\n\nRecherche temps réel:\n\
         - Score et minute exacts\n- Événements récents\n- Cotes actuelles\n- Analyse momentum",
        fixture.home_team,
        fixture.away_team,
        fixture.live_score.as_deref().unwrap_or("0-0"),
        fixture.live_minute.unwrap_or(0),
    );
    let schema = json!({
        "type": "object",
        "properties": {
            "live_score": {"type": "string"},
            "live_minute": {"type": "number"},
            "recent_events": {"type": "array", "items": {"type": "object"}},
            "summary": {"type": "string"},
            "momentum": {"type": "string"}
        }
    });

    let answer = state
        .integrations()
        .llm
        .invoke(LlmRequest {
            prompt,
            add_context_from_internet: true,
            response_json_schema: schema,
        })
        .await?;
    let answer: LiveAnswer = decode_answer(answer)?;

    if let Some(score) = answer.live_score.filter(|s| !s.trim().is_empty()) {
        fixture.live_score = Some(score);
    }
    if let Some(minute) = answer.live_minute.filter(|m| *m > 0.0) {
        fixture.live_minute = Some(minute.min(f64::from(u16::MAX)) as u16);
    }
    fixture.live_events = answer.recent_events.unwrap_or_default();
    fixture.live_analysis = Some(
        json!({"summary": answer.summary, "momentum": answer.momentum}).to_string(),
    );
    fixture.live_updated_at = Some(OffsetDateTime::now_utc());
    state.repo::<MatchEntity>().await?.update(&fixture).await?;
    Ok(fixture)
}

/// Admin entry or correction of a final score. Waits for any reconciliation
/// pass so a match is never settled by two writers at once.
pub async fn update_result(
    state: &SharedState,
    id: Uuid,
    request: UpdateResultRequest,
) -> Result<MatchEntity, ServiceError> {
    let score = FinalScore::parse(&request.final_score)
        .ok_or_else(|| ServiceError::InvalidInput("invalid final score".into()))?;
    let _gate = state.reconcile_gate().lock().await;
    let fixture = get(state, id).await?;
    settle(state, fixture, score, request.result).await
}

fn profit(result: PredictionResult, odds: Option<f64>) -> Option<f64> {
    let odds = odds?;
    match result {
        PredictionResult::Win => Some(odds - 1.0),
        PredictionResult::Loss => Some(-1.0),
        PredictionResult::Pending => None,
    }
}

/// Finish `fixture` with `score` and bring every history entry of the match in
/// line with it. Pending entries credit their owners; settled entries whose
/// result changed move the owner's counters; unchanged entries are skipped.
///
/// Callers hold the reconcile gate.
pub async fn settle(
    state: &SharedState,
    mut fixture: MatchEntity,
    score: FinalScore,
    result_override: Option<PredictionResult>,
) -> Result<MatchEntity, ServiceError> {
    fixture.final_score = Some(score.label());
    fixture.status = MatchStatus::Finished;
    fixture.result = result_override.unwrap_or_else(|| outcome::evaluate(fixture.prediction, score));
    state.repo::<MatchEntity>().await?.update(&fixture).await?;

    let history = state.repo::<PredictionHistoryEntity>().await?;
    let entries = history.filter(|h| h.match_id == fixture.id).await?;

    for mut entry in entries {
        let previous = entry.result;
        let result = match result_override {
            Some(result) => result,
            None => outcome::evaluate(Some(entry.prediction), score),
        };
        if previous == result && entry.final_score == fixture.final_score {
            continue;
        }
        entry.result = result;
        entry.final_score = fixture.final_score.clone();
        entry.profit = profit(result, entry.odds);
        history.update(&entry).await?;

        if previous == result {
            continue;
        }
        let credited = if previous == PredictionResult::Pending {
            stats_service::update_user_stats(state, &entry.user_email, None, result)
                .await
                .map(|_| ())
        } else {
            stats_service::correct_user_stats(state, &entry.user_email, previous, result).await
        };
        if let Err(err) = credited {
            warn!(user = %entry.user_email, error = %err, "failed to update stats after settlement");
        }

        let title = match result {
            PredictionResult::Win => "✅ Pronostic gagnant !",
            PredictionResult::Loss => "❌ Pronostic perdu",
            PredictionResult::Pending => continue,
        };
        let mut notification = NotificationEntity::new(
            &entry.user_email,
            NotificationKind::MatchResult,
            title,
            format!("{} {} {}", fixture.home_team, score.label(), fixture.away_team),
        );
        notification.match_id = Some(fixture.id);
        notification_service::push(state, notification).await?;
    }

    info!(match_id = %fixture.id, score = %score.label(), "match settled");
    Ok(fixture)
}
