use std::collections::BTreeMap;

use time::OffsetDateTime;

use crate::{
    dao::{
        models::{PredictionHistoryEntity, PredictionResult},
        repository::{SortOrder, sort_by_key},
    },
    dto::history::{HistoryDetails, HistoryResponse, HistorySummary, LeagueWinRate},
    error::ServiceError,
    integrations::identity::User,
    services::subscription_service,
    state::SharedState,
};

const HIGH_CONFIDENCE: u8 = 75;
/// Odds assumed for wins recorded without bookmaker odds.
const DEFAULT_WINNING_ODDS: f64 = 1.5;

fn rate(wins: usize, resolved: usize) -> u32 {
    if resolved == 0 {
        0
    } else {
        ((wins as f64 / resolved as f64) * 100.0).round() as u32
    }
}

/// Caller's predictions, newest first, with aggregates. Free users only get
/// the totals.
pub async fn history(state: &SharedState, user: &User) -> Result<HistoryResponse, ServiceError> {
    let repo = state.repo::<PredictionHistoryEntity>().await?;
    let mut entries = repo.filter(|h| h.user_email == user.email).await?;
    sort_by_key(&mut entries, |h| h.created_at, SortOrder::Descending);
    let mut summary = summarize(&entries, OffsetDateTime::now_utc());
    let unlocked = user.is_admin() || subscription_service::is_premium(state, &user.email).await?;
    if !unlocked {
        summary.details = None;
    }
    Ok(HistoryResponse { entries, summary })
}

pub(crate) fn summarize(entries: &[PredictionHistoryEntity], now: OffsetDateTime) -> HistorySummary {
    let is_win = |h: &&PredictionHistoryEntity| h.result == PredictionResult::Win;
    let resolved: Vec<&PredictionHistoryEntity> = entries
        .iter()
        .filter(|h| h.result != PredictionResult::Pending)
        .collect();
    let wins: Vec<&PredictionHistoryEntity> = resolved.iter().copied().filter(is_win).collect();

    let total_profit: f64 = entries.iter().filter_map(|h| h.profit).sum();
    let monthly_profit: f64 = entries
        .iter()
        .filter(|h| h.created_at.year() == now.year() && h.created_at.month() == now.month())
        .filter_map(|h| h.profit)
        .sum();
    let average_winning_odds = if wins.is_empty() {
        0.0
    } else {
        let sum: f64 = wins
            .iter()
            .map(|h| h.odds.unwrap_or(DEFAULT_WINNING_ODDS))
            .sum();
        (sum / wins.len() as f64 * 100.0).round() / 100.0
    };

    let confident: Vec<&&PredictionHistoryEntity> = resolved
        .iter()
        .filter(|h| h.confidence >= HIGH_CONFIDENCE)
        .collect();
    let confident_wins = confident.iter().filter(|h| h.result == PredictionResult::Win).count();

    let mut per_league: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for entry in &resolved {
        let counts = per_league.entry(entry.league.as_str()).or_default();
        counts.0 += 1;
        if entry.result == PredictionResult::Win {
            counts.1 += 1;
        }
    }
    let mut leagues: Vec<LeagueWinRate> = per_league
        .into_iter()
        .map(|(league, (total, wins))| LeagueWinRate {
            league: league.to_string(),
            total,
            wins,
            win_rate: rate(wins, total),
        })
        .collect();
    leagues.sort_by(|a, b| b.win_rate.cmp(&a.win_rate).then(b.total.cmp(&a.total)));

    HistorySummary {
        total: entries.len(),
        wins: wins.len(),
        losses: resolved.len() - wins.len(),
        pending: entries.len() - resolved.len(),
        win_rate: rate(wins.len(), resolved.len()),
        details: Some(HistoryDetails {
            total_profit,
            monthly_profit,
            average_winning_odds,
            high_confidence_win_rate: rate(confident_wins, confident.len()),
            leagues,
        }),
    }
}
